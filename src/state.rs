use crate::config::Config;
use crate::service::TournamentService;

pub struct AppState {
    pub config: Config,
    pub service: TournamentService,
}
