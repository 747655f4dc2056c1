use std::sync::Arc;

use crate::{
    config::CatalogSettings, db::OrmConn, scheduler::Scheduler, timezone::ReferenceZone,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub scheduler: Arc<dyn Scheduler>,
    pub zone: ReferenceZone,
    pub settings: CatalogSettings,
}
