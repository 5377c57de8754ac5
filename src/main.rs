use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockroom::config::ServerConfig;
use stockroom::server::{AppState, create_router};
use stockroom::store::{NewProduct, SqliteStore, Store};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "An inventory management API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "3000")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Replace the database contents with a demo dataset
    Seed {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: f64,
    initial_stock: i64,
    tags: &'static [&'static str],
}

const SEED_TAGS: &[(&str, &str)] = &[
    ("Electronics", "Electronic devices and components"),
    ("Footwear", "Shoes, boots, and other footwear"),
    ("Sale", "Items currently on sale"),
    ("Premium", "High-end premium products"),
    ("Clothing", "Apparel and clothing items"),
];

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "iPhone 15 Pro",
        description: "Latest Apple smartphone with advanced features",
        price: 999.99,
        initial_stock: 25,
        tags: &["Electronics", "Premium"],
    },
    SeedProduct {
        name: "Nike Air Max 270",
        description: "Comfortable running shoes with air cushioning",
        price: 150.00,
        initial_stock: 50,
        tags: &["Footwear", "Sale"],
    },
    SeedProduct {
        name: "Samsung Galaxy Watch",
        description: "Smart watch with health monitoring features",
        price: 299.99,
        initial_stock: 15,
        tags: &["Electronics", "Premium"],
    },
    SeedProduct {
        name: "Adidas Ultraboost 22",
        description: "Premium running shoes with boost technology",
        price: 180.00,
        initial_stock: 30,
        tags: &["Footwear", "Premium"],
    },
    SeedProduct {
        name: "MacBook Pro 14\"",
        description: "Professional laptop with M3 chip",
        price: 1999.99,
        initial_stock: 10,
        tags: &["Electronics", "Premium"],
    },
    SeedProduct {
        name: "Levi's 501 Jeans",
        description: "Classic straight-fit denim jeans",
        price: 89.99,
        initial_stock: 75,
        tags: &["Clothing", "Sale"],
    },
];

fn run_seed(data_dir: String) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: PathBuf::from(data_dir),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    {
        let conn = store.connection();
        conn.execute_batch(
            "DELETE FROM inventory;
             DELETE FROM product_tags;
             DELETE FROM products;
             DELETE FROM tags;",
        )?;
    }

    for &(name, description) in SEED_TAGS {
        store.create_tag(name, Some(description))?;
    }

    // Creating through the store keeps the ledger invariant true for every
    // seeded product (one "Initial stock" movement each).
    for seed in SEED_PRODUCTS {
        store.create_product(&NewProduct {
            name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            price: seed.price,
            initial_stock: seed.initial_stock,
            tags: seed.tags.iter().map(|t| t.to_string()).collect(),
        })?;
    }

    println!(
        "Seeded {} tags and {} products into {}",
        SEED_TAGS.len(),
        SEED_PRODUCTS.len(),
        config.db_path().display()
    );

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stockroom=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: PathBuf::from(data_dir),
            };
            fs::create_dir_all(&config.data_dir)?;

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let state = Arc::new(AppState {
                store: Arc::new(store),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Commands::Seed { data_dir } => {
            run_seed(data_dir)?;
        }
    }

    Ok(())
}
