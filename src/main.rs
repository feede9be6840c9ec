use bevy::prelude::*;
use plumbob_proposal::{config::Config, persistence::Persistence, ProposalPlugin};
use tokio::runtime::Runtime;

fn main() {
    // Load env vars
    let _ = dotenvy::dotenv();

    // Create tokio runtime for async store operations
    let runtime = Runtime::new().expect("Failed to create Tokio runtime");

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "¿Nos vemos?".into(),
            ..default()
        }),
        ..default()
    }))
    .insert_resource(Persistence::new(runtime));

    // After DefaultPlugins so the log subscriber is already installed
    let config = Config::load();
    app.add_plugins(ProposalPlugin::new(config)).run();
}
