mod common;

use anyhow::Result;
use reqwest::StatusCode;
use uuid::Uuid;

use common::{Owner, TestServer};
use propvault::backend::memory::BackendOp;
use propvault::models::Table;

const TWO_MB: usize = 2 * 1024 * 1024;

fn pdf(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len, b'x');
    bytes
}

async fn owner_with_villa(server: &TestServer) -> Result<(Owner, Uuid)> {
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let villa = server.add_property(&owner, "Sunset Villa").await?;
    let villa_id = serde_json::from_value(villa["id"].clone())?;
    Ok((owner, villa_id))
}

#[tokio::test]
async fn upload_stores_blob_and_row() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (owner, villa_id) = owner_with_villa(&server).await?;

    let (status, body) = server
        .upload(&owner, "lease.pdf", pdf(TWO_MB), Some("property_deed"), Some(villa_id))
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    let document = &body["data"];
    assert_eq!(document["file_name"], "lease.pdf");
    assert_eq!(document["file_size"], TWO_MB as u64);
    assert_eq!(document["mime_type"], "application/pdf");
    assert_eq!(document["property_id"], villa_id.to_string());
    assert_eq!(document["type_label"], "Property Deed");
    assert_eq!(document["size_label"], "2.0 MB");
    assert_eq!(body["notice"]["message"], "Document uploaded successfully!");
    assert_eq!(body["notice"]["dismiss_after_ms"], 3000);

    let path = document["file_path"].as_str().unwrap_or_default();
    assert!(path.starts_with(&format!("{}/", owner.user_id)));
    assert!(path.ends_with(".pdf"));
    assert_eq!(server.backend.object_paths(), vec![path.to_string()]);
    assert_eq!(server.backend.object_content_type(path).as_deref(), Some("application/pdf"));

    let (_, list) = server.get(&owner, "/api/documents").await?;
    assert_eq!(list["data"]["heading"], "Documents (1)");
    assert_eq!(list["data"]["documents"][0]["type_label"], "Property Deed");
    assert_eq!(list["data"]["documents"][0]["size_label"], "2.0 MB");
    Ok(())
}

#[tokio::test]
async fn document_type_defaults_to_identity() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;

    let (status, body) = server.upload(&owner, "passport.png", vec![1, 2, 3], None, None).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["document_type"], "identity");
    assert_eq!(body["data"]["mime_type"], "image/png");
    assert!(body["data"]["property_id"].is_null());
    Ok(())
}

#[tokio::test]
async fn oversized_upload_never_reaches_backend() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    server.backend.clear_operations();

    let (status, body) = server
        .upload(&owner, "huge.pdf", pdf(10 * 1024 * 1024 + 1), None, None)
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "File size must be less than 10MB");
    assert_eq!(body["field_errors"]["file"], "File size must be less than 10MB");
    assert!(server.backend.operations().is_empty());
    assert!(server.backend.object_paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn unsupported_extension_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    server.backend.clear_operations();

    let (status, body) = server.upload(&owner, "notes.txt", b"hello".to_vec(), None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["file"].as_str().unwrap_or_default().contains("txt"));
    assert!(server.backend.operations().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_blob_upload_leaves_no_row() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    server.backend.fail_next(BackendOp::Upload, "Bucket not found");

    let (status, body) = server.upload(&owner, "deed.pdf", pdf(1024), None, None).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Bucket not found");
    assert!(server.backend.rows(Table::Documents).is_empty());
    assert!(!server.backend.operations().contains(&BackendOp::Insert(Table::Documents)));
    Ok(())
}

#[tokio::test]
async fn failed_insert_orphans_blob() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    server
        .backend
        .fail_next(BackendOp::Insert(Table::Documents), "new row violates row-level security policy");

    let (status, body) = server.upload(&owner, "deed.pdf", pdf(1024), None, None).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "new row violates row-level security policy");
    assert_eq!(server.backend.object_paths().len(), 1);
    assert!(server.backend.rows(Table::Documents).is_empty());
    Ok(())
}

#[tokio::test]
async fn download_returns_bytes_with_headers() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let content = pdf(4096);
    let (_, body) = server.upload(&owner, "lease.pdf", content.clone(), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default();

    let res = server
        .client
        .get(server.url(&format!("/api/documents/{}/download", id)))
        .bearer_auth(&owner.token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/pdf");
    assert_eq!(res.headers()["content-disposition"], "attachment; filename=\"lease.pdf\"");
    assert_eq!(res.bytes().await?.to_vec(), content);
    Ok(())
}

#[tokio::test]
async fn download_failure_is_an_alert() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let (_, body) = server.upload(&owner, "lease.pdf", pdf(128), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    server.backend.fail_next(BackendOp::Download, "Object not found");

    let (status, body) = server.get(&owner, &format!("/api/documents/{}/download", id)).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["display"], "alert");
    assert_eq!(body["message"], "Failed to download document: Object not found");
    Ok(())
}

#[tokio::test]
async fn delete_requires_confirmation() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let (_, body) = server.upload(&owner, "lease.pdf", pdf(128), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    server.backend.clear_operations();

    let (status, body) = server.delete(&owner, &format!("/api/documents/{}", id)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["display"], "alert");
    assert!(server.backend.operations().is_empty());
    assert_eq!(server.backend.rows(Table::Documents).len(), 1);
    Ok(())
}

#[tokio::test]
async fn confirmed_delete_removes_blob_then_row() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let (_, body) = server.upload(&owner, "lease.pdf", pdf(128), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    server.backend.clear_operations();

    let (status, body) = server.delete(&owner, &format!("/api/documents/{}?confirm=true", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["file_name"], "lease.pdf");

    let ops = server.backend.operations();
    let remove_at = ops.iter().position(|op| *op == BackendOp::Remove);
    let delete_at = ops.iter().position(|op| *op == BackendOp::Delete(Table::Documents));
    assert!(remove_at.is_some() && delete_at.is_some());
    assert!(remove_at < delete_at);
    assert!(server.backend.object_paths().is_empty());
    assert!(server.backend.rows(Table::Documents).is_empty());

    let (_, list) = server.get(&owner, "/api/documents").await?;
    assert_eq!(list["data"]["empty_message"], "No documents uploaded yet");
    Ok(())
}

#[tokio::test]
async fn failed_blob_removal_keeps_row() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let (_, body) = server.upload(&owner, "lease.pdf", pdf(128), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    server.backend.fail_next(BackendOp::Remove, "storage unavailable");

    let (status, body) = server.delete(&owner, &format!("/api/documents/{}?confirm=true", id)).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["display"], "alert");
    assert_eq!(body["message"], "Failed to delete document: storage unavailable");
    assert_eq!(server.backend.rows(Table::Documents).len(), 1);
    assert_eq!(server.backend.object_paths().len(), 1);
    Ok(())
}

#[tokio::test]
async fn documents_of_other_owners_are_invisible() -> Result<()> {
    let server = TestServer::spawn().await?;
    let jane = server.sign_up("jane@example.com", "Jane Owner").await?;
    let omar = server.sign_up("omar@example.com", "Omar Owner").await?;
    let (_, body) = server.upload(&jane, "lease.pdf", pdf(128), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (_, list) = server.get(&omar, "/api/documents").await?;
    assert_eq!(list["data"]["documents"].as_array().map(Vec::len), Some(0));

    let (status, _) = server.get(&omar, &format!("/api/documents/{}/download", id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
