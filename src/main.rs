use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};
use eframe::egui;

use schema_loom::gui::frontend::SchemaApp;
use schema_loom::persistence::cache::{self, CacheStore};
use schema_loom::persistence::settings::AppSettings;
use schema_loom::schema::exchange::Imported;
use schema_loom::schema::{PositionMap, SchemaDocument};

fn main() -> eframe::Result {
    env_logger::init();
    let matches = Command::new("Schema-Loom")
        .about("Interactive graph schema editor")
        .arg(
            Arg::new("document")
                .long("document")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Import a JSON schema document at start-up"),
        )
        .arg(Arg::new("fresh").long("fresh").action(ArgAction::SetTrue).help("Ignore the cached session"))
        .get_matches();

    let settings = AppSettings::load_or_default();
    let store = CacheStore::from_settings(&settings);
    let example = Imported { document: SchemaDocument::example(), positions: PositionMap::new() };
    let mut state = if matches.get_flag("fresh") { example } else { store.load_or(example) };
    if let Some(path) = matches.get_one::<PathBuf>("document") {
        match cache::load_from_path(path) {
            Ok(doc) => state = doc,
            // Keep whatever was resumed; the bad file is only reported
            Err(e) => log::warn!("could not import {}: {:#}", path.display(), e),
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Schema-Loom",
        options,
        Box::new(move |_cc| Ok(Box::new(SchemaApp::new(state, settings, Some(store))) as Box<dyn eframe::App>)),
    )
}
