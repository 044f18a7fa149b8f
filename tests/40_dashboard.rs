mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{eventually, TestServer};
use propvault::models::VerificationStatus;

#[tokio::test]
async fn selecting_a_property_narrows_documents() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let villa = server.add_property(&owner, "Sunset Villa").await?;
    let villa_id: Uuid = serde_json::from_value(villa["id"].clone())?;

    server.upload(&owner, "deed.pdf", b"%PDF deed".to_vec(), Some("property_deed"), Some(villa_id)).await?;
    server.upload(&owner, "passport.jpg", b"jpeg".to_vec(), None, None).await?;

    let (_, all) = server.get(&owner, "/api/documents").await?;
    assert_eq!(all["data"]["title"], "All Documents");
    assert_eq!(all["data"]["heading"], "Documents (2)");

    let (status, selected) = server
        .post(&owner, &format!("/api/properties/{}/select", villa_id), json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selected["data"]["selected_property_id"], villa_id.to_string());

    let (_, narrowed) = server.get(&owner, "/api/documents").await?;
    assert_eq!(narrowed["data"]["title"], "Property Documents");
    assert_eq!(narrowed["data"]["heading"], "Documents (1)");
    assert_eq!(narrowed["data"]["documents"][0]["file_name"], "deed.pdf");

    let (_, dashboard) = server.get(&owner, "/api/dashboard").await?;
    assert_eq!(dashboard["data"]["documents_title"], "Property Documents");
    assert_eq!(dashboard["data"]["selected_property_id"], villa_id.to_string());

    let (_, properties) = server.get(&owner, "/api/properties").await?;
    assert_eq!(properties["data"]["selected_property_id"], villa_id.to_string());
    Ok(())
}

#[tokio::test]
async fn upload_defaults_to_selected_property() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;
    let villa = server.add_property(&owner, "Sunset Villa").await?;
    let villa_id = villa["id"].as_str().unwrap_or_default().to_string();

    server.post(&owner, &format!("/api/properties/{}/select", villa_id), json!({})).await?;
    let (status, body) = server.upload(&owner, "tax.pdf", b"%PDF tax".to_vec(), Some("tax_document"), None).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["property_id"], villa_id);
    assert_eq!(body["data"]["type_label"], "Tax Document");
    Ok(())
}

#[tokio::test]
async fn property_creation_closes_form_and_bumps_revision() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;

    let (_, toggled) = server.post(&owner, "/api/dashboard/property-form/toggle", json!({})).await?;
    assert_eq!(toggled["data"]["property_form_open"], true);

    server.add_property(&owner, "Sunset Villa").await?;

    let (server, owner) = (&server, &owner);
    eventually(move || async move {
        let (_, body) = server.get(owner, "/api/dashboard").await?;
        Ok(body["data"]["property_form_open"] == false && body["data"]["revisions"]["properties"] == 1)
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn document_mutations_bump_documents_revision() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;

    let (_, body) = server.upload(&owner, "lease.pdf", b"%PDF".to_vec(), None, None).await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    server.delete(&owner, &format!("/api/documents/{}?confirm=true", id)).await?;

    let (server, owner) = (&server, &owner);
    eventually(move || async move {
        let (_, body) = server.get(owner, "/api/dashboard").await?;
        Ok(body["data"]["revisions"]["documents"] == 2)
    })
    .await?;

    let (_, body) = server.get(&owner, "/api/dashboard").await?;
    assert_eq!(body["data"]["revisions"]["properties"], 0);
    Ok(())
}

#[tokio::test]
async fn verification_badge_follows_owner_status() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;

    server.backend.set_verification_status(owner.user_id, VerificationStatus::Verified);
    let (_, body) = server.get(&owner, "/api/dashboard").await?;
    assert_eq!(body["data"]["owner"]["badge"]["label"], "Verified");
    assert_eq!(body["data"]["owner"]["badge"]["color"], "green");

    server.backend.set_verification_status(owner.user_id, VerificationStatus::Rejected);
    let (_, body) = server.get(&owner, "/api/dashboard").await?;
    assert_eq!(body["data"]["owner"]["badge"]["color"], "red");
    Ok(())
}

#[tokio::test]
async fn event_stream_reports_owner_mutations() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.sign_up("owner@example.com", "Jane Owner").await?;

    let mut stream = server
        .client
        .get(server.url("/api/events"))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(stream.status(), StatusCode::OK);

    server.add_property(&owner, "Sunset Villa").await?;

    let mut received = String::new();
    while !received.contains("property_created") {
        let chunk = tokio::time::timeout(Duration::from_secs(2), stream.chunk()).await??;
        match chunk {
            Some(bytes) => received.push_str(&String::from_utf8_lossy(&bytes)),
            None => break,
        }
    }
    assert!(received.contains("event: property_created"));
    assert!(received.contains(&owner.user_id.to_string()));
    Ok(())
}

#[tokio::test]
async fn signing_out_one_session_keeps_the_other() -> Result<()> {
    let server = TestServer::spawn().await?;
    let laptop = server.sign_up("owner@example.com", "Jane Owner").await?;
    let phone = server.sign_in(&laptop).await?;
    let villa = server.add_property(&phone, "Sunset Villa").await?;
    let villa_id: Uuid = serde_json::from_value(villa["id"].clone())?;
    server
        .post(&phone, &format!("/api/properties/{}/select", villa_id), json!({}))
        .await?;

    let mut stream = server
        .client
        .get(server.url("/api/events"))
        .bearer_auth(&phone.token)
        .send()
        .await?;

    let (status, _) = server.post(&laptop, "/api/auth/sign-out", json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    server.add_property(&phone, "Beach House").await?;

    let mut received = String::new();
    while !received.contains("property_created") {
        let chunk = tokio::time::timeout(Duration::from_secs(2), stream.chunk()).await??;
        match chunk {
            Some(bytes) => received.push_str(&String::from_utf8_lossy(&bytes)),
            None => break,
        }
    }
    assert!(received.contains("event: signed_out"));
    assert!(received.contains("\"last_session\":false"));
    assert!(received.contains("event: property_created"));

    let (server, phone) = (&server, &phone);
    eventually(move || async move {
        let (_, body) = server.get(phone, "/api/dashboard").await?;
        Ok(body["data"]["revisions"]["properties"] == 2)
    })
    .await?;
    let (status, dashboard) = server.get(phone, "/api/dashboard").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["data"]["selected_property_id"], villa_id.to_string());
    Ok(())
}
