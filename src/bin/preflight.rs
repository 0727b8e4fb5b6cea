use storefront_api::infra::logging::setup_tracing;
use storefront_api::{Config, PgStorage, Storage, StorageBackend};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--apply-schema]\n\
         \n\
         Reads env vars (or .env):\n\
           STORAGE_BACKEND (postgres | memory), DATABASE_URL, BIND_ADDR, DB_MAX_CONNECTIONS\n\
         \n\
         --apply-schema   create any missing tables\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let apply_schema = args.iter().any(|a| a == "--apply-schema");

    let config = Config::from_env()?;
    println!("> Preflight:");
    println!("  STORAGE_BACKEND={:?}", config.storage_backend);
    println!("  BIND_ADDR={}", config.bind_addr);
    println!("  DB_MAX_CONNECTIONS={}", config.db_max_connections);

    if config.storage_backend == StorageBackend::Memory {
        println!("> In-memory backend selected; nothing to check.");
        return Ok(());
    }

    // Connect without touching the schema so missing tables can be reported.
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(config.database_url()?)
        .await?;
    let storage = PgStorage::with_pool(pool);
    storage.ping().await?;
    println!("> Database reachable.");

    let missing = storage.missing_tables().await?;
    if missing.is_empty() {
        println!("> All tables present.");
    } else if apply_schema {
        storage.apply_schema().await?;
        println!("> Created tables: {}", missing.join(", "));
    } else {
        println!("> Missing tables: {}", missing.join(", "));
        println!("  Re-run with --apply-schema, or start api_server (it creates them on boot).");
        std::process::exit(1);
    }

    println!("> Preflight OK.");
    Ok(())
}
