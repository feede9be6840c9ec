//! PLUMBOB PROPOSAL - a yes/no question where "no" runs away
//!
//! The page asks one question. The decline button jumps somewhere else
//! whenever the pointer gets near it, floating emoji can be clicked for
//! points, and every dodge, reward and the final answer are written to a
//! document store in the background.

pub mod audio;
pub mod config;
pub mod page;
pub mod persistence;
pub mod position;
pub mod recorder;
pub mod records;
pub mod rewards;
pub mod session;
pub mod store;
pub mod theme;

use bevy::prelude::*;

use crate::audio::SoundtrackPlugin;
use crate::config::Config;
use crate::page::PagePlugin;
use crate::persistence::PersistencePlugin;
use crate::rewards::RewardGamePlugin;

/// Assembles the page for one configured variant.
///
/// Expects a [`persistence::Persistence`] resource to be inserted by the caller,
/// since it owns the tokio runtime.
pub struct ProposalPlugin {
    config: Config,
}

impl ProposalPlugin {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Plugin for ProposalPlugin {
    fn build(&self, app: &mut App) {
        let page = &self.config.page;
        app.insert_resource(ClearColor(page.theme.palette().background))
            .insert_resource(page.clone())
            .insert_resource(self.config.store.clone())
            .add_plugins((PersistencePlugin, PagePlugin));

        if page.has_reward_game {
            app.add_plugins(RewardGamePlugin);
        }
        if page.has_audio {
            app.add_plugins(SoundtrackPlugin);
        }
    }
}
