use crate::traits::{BrandManagement, UserManagement, WalletManagement};

/// This trait defines the highest level of behaviour for backends supporting the passport service: the user, brand
/// and wallet repositories behind one connection handle.
#[allow(async_fn_in_trait)]
pub trait PassportDatabase: Clone + UserManagement + BrandManagement + WalletManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the connections held by this handle.
    async fn close(&self);
}
