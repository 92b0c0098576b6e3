//! Transaction Card Builder
//!
//! Projects a decoded transaction into the ordered list of display cards
//! the UI renders for review. Pure and deterministic; never touches the
//! vault.

pub mod builder;
pub mod format;
pub mod types;

pub use builder::{build, error_cards, AuthorInfo, CardContext};
pub use format::{format_balance, hex_string, printable_text};
pub use types::{Card, CardKind, TransactionCard};
