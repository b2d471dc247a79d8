#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::Constructor)]
#[display("{field}: {message}")]
pub struct DomainAssertionError {
    field: &'static str,
    message: &'static str,
}

impl DomainAssertionError {
    pub fn field(&self) -> &'static str {
        self.field
    }
}
