use db::DBService;

pub mod error;
pub mod middleware;
pub mod routes;

/// Shared handler state: the database service plus anything else the routes
/// need.
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
}

impl Deployment {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }
}
