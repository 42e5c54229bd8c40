//! excel-view CLI - export data through declarative column specs
//!
//! # Commands
//!
//! ```bash
//! excel-view export --spec members.json --data members.csv   # Write members.xlsx
//! excel-view inspect --spec members.json                     # Headers, inputs, relations
//! excel-view serve --config views.json                       # Start HTTP server (port 3000)
//! excel-view example-spec                                    # Show an example column spec
//! excel-view operations                                      # Show reducers and operations
//! ```

use clap::{Parser, Subcommand};
use excel_view::{
    load_source, operations_description, ColSpecDefinition, ExcelView, OutputFormat, ServerConfig,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CONFIG: &str = "views.json";

#[derive(Parser)]
#[command(name = "excel-view")]
#[command(about = "Export rows as spreadsheets through declarative column specs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a data file through a column spec
    Export {
        /// Column spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Input rows (.csv or .json)
        #[arg(short, long)]
        data: PathBuf,

        /// Download name without extension
        #[arg(short, long, default_value = "spreadsheet")]
        file_name: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,

        /// Output file (default: <file-name>.<ext> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the headers, inputs and relations of a column spec
    Inspect {
        /// Column spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Views configuration (default: $EXCEL_VIEW_CONFIG or views.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (default: $EXCEL_VIEW_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show example column spec
    ExampleSpec,

    /// Show available reducers and operations
    Operations,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export { spec, data, file_name, format, output } => {
            cmd_export(&spec, &data, &file_name, format, output.as_deref())
        }

        Commands::Inspect { spec } => cmd_inspect(&spec),

        Commands::Serve { config, port } => cmd_serve(config, port).await,

        Commands::ExampleSpec => cmd_example_spec(),

        Commands::Operations => cmd_operations(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn view_name(spec: &Path) -> String {
    spec.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export")
        .to_string()
}

fn cmd_export(
    spec: &Path,
    data: &Path,
    file_name: &str,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Column spec: {}", spec.display());
    let colspec = ColSpecDefinition::from_file(spec)?.build()?;
    eprintln!("   Columns: {}", colspec.headers().join(", "));

    eprintln!("📥 Data: {}", data.display());
    let source = load_source(data)?;
    eprintln!("   Rows: {}", source.len());

    let view = ExcelView::new(view_name(spec))
        .with_colspec(colspec)
        .with_file_name(file_name);
    let response = view.get(&source, format.responder().as_ref())?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&response.file_name));
    fs::write(&path, &response.body)?;
    eprintln!("💾 Output written to: {}", path.display());

    Ok(())
}

fn cmd_inspect(spec: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let definition = ColSpecDefinition::from_file(spec)?;
    let colspec = definition.build()?;

    if !definition.description.is_empty() {
        println!("{}\n", definition.description);
    }
    println!("Headers: {}", colspec.headers().join(", "));
    println!("Inputs:  {}", colspec.inputs().join(", "));

    let mut related: Vec<&str> = colspec.related().into_iter().collect();
    related.sort_unstable();
    if related.is_empty() {
        println!("Related: (none)");
    } else {
        println!("Related: {}", related.join(", "));
    }
    Ok(())
}

fn cmd_example_spec() -> Result<(), Box<dyn std::error::Error>> {
    let definition = excel_view::example_definition();
    println!("{}", definition.to_json()?);
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

async fn cmd_serve(config: Option<PathBuf>, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config
        .or_else(|| env::var_os("EXCEL_VIEW_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let port = match port {
        Some(port) => port,
        None => match env::var("EXCEL_VIEW_PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| format!("Invalid EXCEL_VIEW_PORT: {}", value))?,
            Err(_) => DEFAULT_PORT,
        },
    };

    eprintln!("📋 Views: {}", config_path.display());
    let config = ServerConfig::from_file(&config_path)?;
    excel_view::server::start_server(&config, port).await?;
    Ok(())
}
