pub(crate) mod pokemontcg;

/// Sent with every request so the API operators can tell who is paging through them
pub(crate) const USER_AGENT: &str = concat!("cardfetch/", env!("CARGO_PKG_VERSION"));
