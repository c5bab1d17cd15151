use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub tax_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateChildRequest {
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
