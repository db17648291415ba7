#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Service-account session and REST clients for the Firebase APIs used by the
//! KULOOC admin tooling.
//!
//! Layout:
//! - `credential.rs`: service-account key loading
//! - `token.rs`: JWT-bearer token exchange and caching
//! - `rest.rs`: bearer-authenticated JSON transport
//! - `value.rs`: Firestore typed value codec
//! - `firestore.rs`: document listing, queries, commits
//! - `indexes.rs`: composite index creation and operation polling
//! - `rules.rs`: rulesets and releases
//! - `accounts.rs`: Identity Toolkit account deletion
//! - `store.rs`: storage traits consumed by command handlers
//! - `session.rs`: one-call setup from a credential file

pub mod accounts;
pub mod credential;
pub mod error;
pub mod firestore;
pub mod indexes;
pub mod rest;
pub mod rules;
pub mod session;
pub mod store;
pub mod token;
pub mod value;

pub use accounts::AccountsClient;
pub use credential::ServiceAccountKey;
pub use error::{ApiStatus, FirebaseError, FirebaseResult};
pub use firestore::{Document, FieldQuery, FirestoreClient};
pub use indexes::{IndexAdminClient, IndexBuild, IndexDescriptor, IndexOrder, Operation};
pub use rules::{FIRESTORE_RELEASE, ReleaseOutcome, RulesClient, Ruleset};
pub use session::{Endpoints, FirebaseSession};
pub use store::{AccountStore, DocumentStore};
pub use token::{StaticToken, TokenSource};
