use serde::Deserialize;
use serde_json::Value;

/// Raw create/update body. Values stay untyped until validation so
/// that each bad field gets its own message.
#[derive(Debug, Default, Deserialize)]
pub struct SweetInput {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub quantity_in_stock: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestockRequest {
    #[serde(default)]
    pub quantity: Option<Value>,
}
