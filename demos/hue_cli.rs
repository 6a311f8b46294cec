//! CLI application for Philips Hue bridges.
//!
//! Talks to a bridge directly for one-off commands, or runs the full
//! node server against a console controller that prints every update.
//!
//! Run with: cargo run --example hue_cli -- --help

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hue_node_rs::{
    BridgeSession, Brightness, Color, Connector, Controller, Driver, HttpConnector, Hub,
    JsonFileStore, Kelvin, NodeInfo, Payload, Settings, discover_bridges,
};

#[derive(Parser)]
#[command(name = "hue-cli")]
#[command(about = "Control Philips Hue bridges from the command line", long_about = None)]
struct Cli {
    /// Bridge address (discovered automatically when omitted)
    #[arg(short, long, global = true)]
    bridge: Option<String>,

    /// Application key; a new one is registered when omitted
    #[arg(short, long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover Hue bridges on the network
    Discover {
        /// Discovery timeout in seconds (default: 5)
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },

    /// Pair with the bridge (press the link button first)
    Register,

    /// List lights
    Lights,

    /// List groups
    Groups,

    /// List scenes
    Scenes,

    /// Turn a light on
    On { light: String },

    /// Turn a light off
    Off { light: String },

    /// Set brightness (1-254)
    Brightness {
        light: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=254))]
        level: u8,
    },

    /// Set RGB color (0-255 for each component)
    Color {
        light: String,
        red: u8,
        green: u8,
        blue: u8,
    },

    /// Set color temperature in Kelvin (2000-6500)
    Temperature {
        light: String,
        #[arg(value_parser = clap::value_parser!(u32).range(2000..=6500))]
        kelvin: u32,
    },

    /// Recall a scene on a group
    Scene { group: String, scene: String },

    /// Run the node server, printing every controller update
    Serve {
        /// Where application keys are kept
        #[arg(short, long, default_value = "hue_credentials.json")]
        store: String,

        /// Poll interval in seconds
        #[arg(short, long, default_value = "10")]
        interval: u64,
    },
}

/// A controller that prints instead of updating a real host.
struct ConsoleController;

impl Controller for ConsoleController {
    fn add_node(&self, node: NodeInfo) {
        println!("+ {:<20} {:<14} {}", node.address, node.node_def, node.name);
    }

    fn remove_node(&self, address: &str) {
        println!("- {}", address);
    }

    fn set_driver(&self, address: &str, driver: Driver, value: f64) {
        println!("  {:<20} {:<8} {}", address, driver.to_string(), value);
    }

    fn notice(&self, key: &str, text: &str) {
        println!("! [{}] {}", key, text);
    }

    fn remove_notice(&self, key: &str) {
        println!("! [{}] cleared", key);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let connector = HttpConnector::new("hue-node-rs#cli");

    match cli.command {
        Commands::Discover { timeout } => {
            println!(
                "Discovering Hue bridges on the network (timeout: {}s)...",
                timeout
            );
            let bridges = discover_bridges(Duration::from_secs(timeout)).await?;
            if bridges.is_empty() {
                println!("No bridges found on the network.");
            } else {
                println!("\nFound {} bridge(s):", bridges.len());
                for bridge in bridges {
                    println!(
                        "  IP: {:15}  ID: {}",
                        bridge.ip.to_string(),
                        bridge.bridge_id.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Serve { store, interval } => {
            let mut params = HashMap::new();
            if let Some(bridge) = &cli.bridge {
                params.insert("bridges".to_string(), serde_json::to_string(&[bridge])?);
            }
            let mut settings = Settings::from_params(&params)?;
            if let (Some(bridge), Some(key)) = (&cli.bridge, &cli.key) {
                settings.seed_credentials.insert(bridge.clone(), key.clone());
            }
            settings.poll_interval = Duration::from_secs(interval.max(1));

            let hub = Hub::new(
                settings,
                Arc::new(connector),
                Arc::new(JsonFileStore::new(store)),
                Arc::new(ConsoleController),
            );
            for report in hub.start().await {
                match report {
                    Ok(report) => println!("Discovery: {:?}", report),
                    Err(e) => eprintln!("Discovery failed: {}", e),
                }
            }
            println!("\nSyncing... (Press Ctrl+C to stop)\n");
            hub.run().await;
        }

        command => {
            let session = connector
                .connect(cli.bridge.as_deref(), cli.key.as_deref())
                .await?;
            run_direct(session.as_ref(), command).await?;
        }
    }

    Ok(())
}

async fn run_direct(
    session: &dyn BridgeSession,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut payload = Payload::new();

    let results = match command {
        Commands::Discover { .. } | Commands::Serve { .. } => unreachable!(),

        Commands::Register => {
            println!("Registered with {}", session.address());
            println!("Application key: {}", session.credential());
            return Ok(());
        }

        Commands::Lights => {
            let mut lights: Vec<_> = session.get_lights().await?.into_iter().collect();
            lights.sort_by(|a, b| a.0.cmp(&b.0));
            for (id, light) in lights {
                println!(
                    "  {:>3}  {:<16} {:<24} {:<4} bri {}",
                    id,
                    light.address(),
                    light.name,
                    if light.state.on { "ON" } else { "OFF" },
                    light.state.bri.map(|b| b.value()).unwrap_or_default()
                );
            }
            return Ok(());
        }

        Commands::Groups => {
            let mut groups: Vec<_> = session.get_groups().await?.into_iter().collect();
            groups.sort_by(|a, b| a.0.cmp(&b.0));
            for (id, group) in groups {
                println!(
                    "  {:>3}  {:<24} {} light(s){}",
                    id,
                    group.name,
                    group.lights.len(),
                    if group.state.any_on { ", some on" } else { "" }
                );
            }
            return Ok(());
        }

        Commands::Scenes => {
            for (id, scene) in session.get_scenes().await? {
                println!(
                    "  {:<16} {:<24} group {}",
                    id,
                    scene.name,
                    scene.group.as_deref().unwrap_or("-")
                );
            }
            return Ok(());
        }

        Commands::On { light } => {
            payload.on(true);
            session.set_light(&light, &payload).await?
        }

        Commands::Off { light } => {
            payload.on(false);
            session.set_light(&light, &payload).await?
        }

        Commands::Brightness { light, level } => {
            payload.on(true);
            payload.brightness(&Brightness::clamped(i64::from(level)));
            session.set_light(&light, &payload).await?
        }

        Commands::Color {
            light,
            red,
            green,
            blue,
        } => {
            payload.on(true);
            payload.xy(&Color::rgb(red, green, blue).to_xy());
            session.set_light(&light, &payload).await?
        }

        Commands::Temperature { light, kelvin } => {
            payload.on(true);
            payload.temperature(&Kelvin::new(kelvin).to_mired());
            session.set_light(&light, &payload).await?
        }

        Commands::Scene { group, scene } => {
            payload.scene(&scene);
            session.set_group(&group, &payload).await?
        }
    };

    for result in results {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}
