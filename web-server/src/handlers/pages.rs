//! Static pages

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct AboutView {
    page: &'static str,
    title: &'static str,
    description: &'static str,
}

pub async fn about() -> Json<AboutView> {
    Json(AboutView {
        page: "about",
        title: "About FraudGuard",
        description: "FraudGuard scores e-commerce transactions with a trained fraud \
                      classifier and summarizes historical fraud in a statistics dashboard.",
    })
}
