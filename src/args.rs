use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::analyze::DEFAULT_ANALYSIS_FILE;
use crate::databases::mysql::{MysqlConfig, MysqlDB};
use crate::databases::postgres::{PostgresConfig, PostgresDB};
use crate::error::Error;
use crate::importer::{DEFAULT_BATCH_SIZE, DanglingPolicy};
use crate::report::DEFAULT_REPORT_FILE;
use crate::schema::DEFAULT_SCHEMA_FILE;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
#[command(next_line_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,

    /// Disable output
    #[clap(long, action, global = true)]
    pub quiet: bool,

    /// Log level
    #[arg(long, default_value_t = Level::INFO, global = true)]
    pub log_level: Level,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// Describe the MySQL database into a JSON file
    Analyze {
        #[arg(long, default_value = DEFAULT_ANALYSIS_FILE)]
        output: PathBuf,
    },
    /// Generate the PostgreSQL schema script
    Schema {
        #[command(flatten)]
        schema: SchemaArgs,
        /// List of tables, every source table by default
        #[arg(long, short)]
        table: Vec<String>,
    },
    /// Apply a schema script to PostgreSQL
    ApplySchema {
        #[arg(long, default_value = DEFAULT_SCHEMA_FILE)]
        input: PathBuf,
    },
    /// Copy data into existing PostgreSQL tables
    Import(ImportArgs),
    /// Generate and apply the schema, then import and verify
    Migrate {
        #[command(flatten)]
        schema: SchemaArgs,
        #[command(flatten)]
        import: ImportArgs,
    },
    /// Compare tables and row counts of both databases
    Compare,
    /// Drop every table and sequence of the PostgreSQL public schema
    DropAll,
}

#[derive(clap::Args, Clone, Debug, PartialEq)]
pub struct SchemaArgs {
    /// Where the generated script is written
    #[arg(long, default_value = DEFAULT_SCHEMA_FILE)]
    pub output: PathBuf,

    /// Start the script with DROP SCHEMA public CASCADE
    #[clap(long, action)]
    pub drop_existing: bool,
}

#[derive(clap::Args, Clone, Debug, PartialEq)]
pub struct ImportArgs {
    /// Maximum number of rows per table
    pub limit: Option<u64>,

    /// List of tables, every source table by default
    #[arg(long, short)]
    pub table: Vec<String>,

    /// Rows fetched from MySQL per query
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u64,

    /// What to do with foreign keys pointing to missing rows
    #[arg(long, value_enum, default_value_t = DanglingPolicy::Report)]
    pub dangling: DanglingPolicy,

    /// Where the JSON report is written
    #[arg(long, default_value = DEFAULT_REPORT_FILE)]
    pub report: PathBuf,

    /// JSON import plan, the built-in legacy plan by default
    #[arg(long)]
    pub plan: Option<PathBuf>,
}

impl Default for ImportArgs {
    fn default() -> Self {
        return Self {
            limit: None,
            table: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            dangling: DanglingPolicy::Report,
            report: PathBuf::from(DEFAULT_REPORT_FILE),
            plan: None,
        };
    }
}

#[derive(clap::Args, Clone, Debug, PartialEq)]
pub struct SourceArgs {
    #[arg(long, env = "MYSQL_HOST", default_value = "127.0.0.1", global = true)]
    pub mysql_host: String,

    #[arg(long, env = "MYSQL_PORT", default_value_t = 3306, global = true)]
    pub mysql_port: u16,

    #[arg(long, env = "MYSQL_USER", default_value = "animekunnet", global = true)]
    pub mysql_user: String,

    #[arg(long, env = "MYSQL_PASSWORD", default_value = "", hide_env_values = true, global = true)]
    pub mysql_password: String,

    #[arg(long, env = "MYSQL_DATABASE", default_value = "animekunnet", global = true)]
    pub mysql_database: String,
}

#[derive(clap::Args, Clone, Debug, PartialEq)]
pub struct DestinationArgs {
    #[arg(long, env = "DB_HOST", default_value = "localhost", global = true)]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432, global = true)]
    pub db_port: u16,

    #[arg(long, env = "DB_USER", default_value = "anime_user", global = true)]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "anime_password", hide_env_values = true, global = true)]
    pub db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "anime_kun", global = true)]
    pub db_name: String,
}

impl SourceArgs {
    pub fn config(&self) -> MysqlConfig {
        return MysqlConfig {
            host: self.mysql_host.clone(),
            port: self.mysql_port,
            user: self.mysql_user.clone(),
            password: self.mysql_password.clone(),
            database: self.mysql_database.clone(),
        };
    }

    pub fn connect(&self) -> Result<MysqlDB, Error> {
        return MysqlDB::new(&self.config()).map_err(|source| Error::Connection {
            store: "mysql",
            source,
        });
    }
}

impl DestinationArgs {
    pub fn config(&self) -> PostgresConfig {
        return PostgresConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
        };
    }

    pub fn connect(&self) -> Result<PostgresDB, Error> {
        return PostgresDB::new(&self.config()).map_err(|source| Error::Connection {
            store: "postgres",
            source,
        });
    }
}

impl Args {
    pub fn new(command: Command, source: MysqlConfig, destination: PostgresConfig) -> Self {
        return Args {
            command,
            source: SourceArgs {
                mysql_host: source.host,
                mysql_port: source.port,
                mysql_user: source.user,
                mysql_password: source.password,
                mysql_database: source.database,
            },
            destination: DestinationArgs {
                db_host: destination.host,
                db_port: destination.port,
                db_user: destination.user,
                db_password: destination.password,
                db_name: destination.database,
            },
            quiet: true,
            log_level: Level::INFO,
        };
    }
}
