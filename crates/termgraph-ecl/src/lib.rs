//! ECL resolution over the termgraph store.
//!
//! Simple constraints (`*`, `<<X`, `<X`, `>X`, `>>X`, `<!X`, `>!X`, a bare
//! id) are answered from the local store and hierarchy caches once the store
//! is populated. Everything else is expanded by a remote terminology server
//! through the cursor-paged [`RemoteEclClient`] contract. Top-level `OR`
//! is split and unioned locally in either case.

pub mod error;
pub mod expr;
pub mod remote;
pub mod resolver;

pub use error::EclError;
pub use expr::{is_simple, normalize, split_top_level_or, LocalExpr};
#[cfg(feature = "remote-http")]
pub use remote::HttpEclClient;
pub use remote::{concepts_url, decode_page, ConceptRef, EclPage, NoRemote, RemoteEclClient};
pub use resolver::{EclContext, EclResolver, EclResolvers, EclSettings};
