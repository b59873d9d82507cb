// ID Provider Port (for deterministic testing)

/// Session id generator
pub trait IdProvider: Send + Sync {
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Always returns the same id
pub struct FixedIdProvider(pub &'static str);

impl IdProvider for FixedIdProvider {
    fn generate_id(&self) -> String {
        self.0.to_string()
    }
}
