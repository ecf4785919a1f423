// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running router server

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use agent_router_core::application::RouteTestReport;
use agent_router_core::domain::route::Route;

#[derive(Debug, Clone)]
pub struct RouterClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RouteList {
    pub routes: Vec<Route>,
    pub total: usize,
}

impl RouterClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn for_server(host: &str, port: u16) -> Result<Self> {
        Self::new(format!("http://{}:{}", host, port))
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(format!("{}/health", self.base_url)).send().await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    pub async fn list_routes(&self, skip: usize, limit: usize) -> Result<RouteList> {
        let response = self
            .client
            .get(format!("{}/api/v1/routes?skip={}&limit={}", self.base_url, skip, limit))
            .send()
            .await
            .context("Failed to list routes")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to list routes: {}", error_text);
        }

        response.json().await.context("Failed to parse route list")
    }

    pub async fn test_route(&self, route_id: Uuid, user_roles: Vec<String>) -> Result<RouteTestReport> {
        #[derive(Serialize)]
        struct TestRequest {
            route_id: Uuid,
            user_roles: Vec<String>,
        }

        let response = self
            .client
            .post(format!("{}/api/v1/routes/test", self.base_url))
            .json(&TestRequest { route_id, user_roles })
            .send()
            .await
            .context("Failed to test route")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to test route: {}", error_text);
        }

        response.json().await.context("Failed to parse route test report")
    }
}
