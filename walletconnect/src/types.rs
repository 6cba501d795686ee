//! Wire types shared with the WalletConnect transport
pub use walletconnect_types::*;
