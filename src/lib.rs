pub mod api;
pub mod cluster;
pub mod config;
pub mod error;
pub mod query;
pub mod store;
pub mod transport;

pub use api::{DocValue, StoreApi};
pub use cluster::DiscoveryClient;
pub use config::{Consistency, StoreConfig};
pub use error::{Result, RqdocError};
pub use query::{Filter, QueryOpts, SortDirection};
pub use store::{DocumentStore, RemoveOpts, SaveOpts};
pub use transport::{
    Endpoint, HttpTransport, Method, Protocol, RawResponse, RedirectEngine, RequestContext,
    Transport,
};
