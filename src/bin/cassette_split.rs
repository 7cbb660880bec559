//! Splits a monolithic cassette YAML file into per-port cassette files.
//!
//! Usage: `cassette_split <input.yaml> <output_dir>`
//!
//! The output directory has the same layout as a recording session, so it
//! can be replayed with `CassetteConfig::from_session_dir`.

use std::collections::BTreeMap;
use std::path::Path;
use std::{env, fs, process};

use anonid::cassette::config::{port_cassette_file, CassetteConfig};
use anonid::cassette::format::{Cassette, Interaction};

/// Groups interactions by port, renumbering each group from zero.
fn group_by_port(cassette: &Cassette) -> BTreeMap<String, Vec<Interaction>> {
    let mut by_port: BTreeMap<String, Vec<Interaction>> = BTreeMap::new();
    for interaction in &cassette.interactions {
        let group = by_port.entry(interaction.port.clone()).or_default();
        group.push(Interaction { seq: group.len() as u64, ..interaction.clone() });
    }
    by_port
}

fn split_cassette(input: &Path, output_dir: &Path) -> Result<Vec<String>, String> {
    let cassette = CassetteConfig::read_cassette(input)?;

    fs::create_dir_all(output_dir)
        .map_err(|e| format!("Failed to create {}: {e}", output_dir.display()))?;

    let mut ports = Vec::new();
    for (port, interactions) in group_by_port(&cassette) {
        let per_port = Cassette {
            name: format!("{}-{port}", cassette.name),
            recorded_at: cassette.recorded_at,
            version: cassette.version.clone(),
            interactions,
        };

        let file_path = output_dir.join(port_cassette_file(&port));
        let yaml = serde_yaml::to_string(&per_port)
            .map_err(|e| format!("Failed to serialize cassette for port {port}: {e}"))?;
        fs::write(&file_path, yaml)
            .map_err(|e| format!("Failed to write {}: {e}", file_path.display()))?;

        println!("Wrote {}", file_path.display());
        ports.push(port);
    }

    Ok(ports)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: cassette_split <input.yaml> <output_dir>");
        process::exit(1);
    }

    if let Err(e) = split_cassette(Path::new(&args[1]), Path::new(&args[2])) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
