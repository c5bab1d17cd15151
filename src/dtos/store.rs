use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateWarehouseRequest {
    pub name: String,
}
