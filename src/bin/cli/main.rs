use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oss_bucket::{
    BucketName, OssBucket, OssConfig, SignMethod, StorageBackend, create_bucket,
};
use serde::Serialize;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "oss-bucket")]
#[command(about = "Work with the objects of one OSS bucket", long_about = None)]
struct Cli {
    /// OSS endpoint, e.g. oss-cn-hangzhou.aliyuncs.com
    #[arg(long, env = "OSS_ENDPOINT", default_value = "oss-cn-hangzhou.aliyuncs.com")]
    endpoint: String,

    /// Access key id
    #[arg(long, env = "OSS_ACCESS_KEY_ID", default_value = "")]
    access_key_id: String,

    /// Access key secret
    #[arg(long, env = "OSS_ACCESS_KEY_SECRET", default_value = "", hide_env_values = true)]
    access_key_secret: String,

    /// Bucket name
    #[arg(short, long, env = "OSS_BUCKET")]
    bucket: String,

    /// Custom domain bound to the bucket
    #[arg(long, env = "OSS_CNAME")]
    cname: Option<String>,

    /// Region used for request signing
    #[arg(long, env = "OSS_REGION", default_value = "oss-cn-hangzhou")]
    region: String,

    /// Keep objects in process memory instead of talking to OSS
    #[arg(long)]
    memory: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List objects and common prefixes
    List {
        /// Key prefix
        #[arg(short, long, default_value = "")]
        prefix: String,
        /// Maximum number of entries
        #[arg(short, long, default_value_t = 100)]
        max_keys: usize,
        /// Grouping delimiter, '/' or empty
        #[arg(short, long, default_value = "/")]
        delimiter: String,
        /// List entries after this key
        #[arg(long, default_value = "")]
        marker: String,
    },

    /// Create a virtual directory
    Mkdir {
        /// Directory name, without trailing '/'
        name: String,
    },

    /// Upload a string as an object
    Put {
        /// Object key
        name: String,
        /// Object content
        content: String,
    },

    /// Upload a local file
    Upload {
        /// Object key
        name: String,
        /// File to upload
        file: PathBuf,
    },

    /// Append a string to an appendable object
    Append {
        /// Object key
        name: String,
        /// Content to append
        content: String,
        /// Current length of the object
        #[arg(short, long, default_value_t = 0)]
        position: u64,
    },

    /// Append a local file to an appendable object
    AppendFile {
        /// Object key
        name: String,
        /// File to append
        file: PathBuf,
        /// Current length of the object
        #[arg(short, long, default_value_t = 0)]
        position: u64,
    },

    /// Copy an object
    Copy {
        /// Source key
        from: String,
        /// Destination key
        to: String,
        /// Destination bucket; defaults to the configured bucket
        #[arg(long, default_value = "")]
        to_bucket: String,
    },

    /// Show object metadata
    Meta {
        /// Object key
        name: String,
    },

    /// Delete an object
    Delete {
        /// Object key
        name: String,
    },

    /// Delete several objects at once
    DeleteMany {
        /// Object keys
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Download an object
    Get {
        /// Object key
        name: String,
        /// Output file path; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check whether an object exists
    Exists {
        /// Object key
        name: String,
    },

    /// Upload a local file in parts
    Multiupload {
        /// Object key
        name: String,
        /// File to upload
        file: PathBuf,
    },

    /// Create a pre-signed URL
    Sign {
        /// Object key
        name: String,
        /// Validity in seconds
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,
        /// HTTP method the URL grants, GET or PUT
        #[arg(short, long, default_value = "GET")]
        method: SignMethod,
    },
}

impl Cli {
    fn to_config(&self) -> Result<OssConfig> {
        let bucket = BucketName::new(self.bucket.as_str())
            .with_context(|| format!("invalid bucket name '{}'", self.bucket))?;

        Ok(OssConfig::builder()
            .endpoint(self.endpoint.as_str())
            .access_key_id(self.access_key_id.as_str())
            .access_key_secret(self.access_key_secret.as_str())
            .bucket(bucket)
            .maybe_cname(self.cname.clone())
            .region(self.region.as_str())
            .build())
    }

    fn backend(&self) -> StorageBackend {
        if self.memory {
            StorageBackend::InMemory
        } else {
            StorageBackend::Oss
        }
    }

    fn init_logging(&self) {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::WARN,
        };

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(level)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(bucket: &OssBucket, command: Commands) -> Result<()> {
    match command {
        Commands::List {
            prefix,
            max_keys,
            delimiter,
            marker,
        } => {
            let listing = bucket
                .list_objects(&prefix, max_keys, &delimiter, &marker)
                .await
                .context("Failed to list objects")?;
            print_json(&listing)?;
        }
        Commands::Mkdir { name } => {
            bucket
                .create_object_dir(&name)
                .await
                .with_context(|| format!("Failed to create directory '{}'", name))?;
            println!("Created {}/", name);
        }
        Commands::Put { name, content } => {
            bucket
                .put_object(&name, content)
                .await
                .with_context(|| format!("Failed to put '{}'", name))?;
            println!("Stored {}", name);
        }
        Commands::Upload { name, file } => {
            bucket
                .upload_file(&name, &file)
                .await
                .with_context(|| format!("Failed to upload {} to '{}'", file.display(), name))?;
            println!("Uploaded {} to {}", file.display(), name);
        }
        Commands::Append {
            name,
            content,
            position,
        } => {
            let next = bucket
                .append_object(&name, content, position)
                .await
                .with_context(|| format!("Failed to append to '{}'", name))?;
            println!("{}", next);
        }
        Commands::AppendFile {
            name,
            file,
            position,
        } => {
            let next = bucket
                .append_file(&name, &file, position)
                .await
                .with_context(|| format!("Failed to append {} to '{}'", file.display(), name))?;
            println!("{}", next);
        }
        Commands::Copy {
            from,
            to,
            to_bucket,
        } => {
            bucket
                .copy_object(&from, &to, &to_bucket)
                .await
                .with_context(|| format!("Failed to copy '{}' to '{}'", from, to))?;
            println!("Copied {} to {}", from, to);
        }
        Commands::Meta { name } => {
            let meta = bucket
                .get_object_meta(&name)
                .await
                .with_context(|| format!("Failed to read metadata of '{}'", name))?;
            print_json(&meta)?;
        }
        Commands::Delete { name } => {
            bucket
                .delete_object(&name)
                .await
                .with_context(|| format!("Failed to delete '{}'", name))?;
            println!("Deleted {}", name);
        }
        Commands::DeleteMany { names } => {
            let deleted = bucket
                .delete_objects(names.as_slice())
                .await
                .context("Failed to delete objects")?;
            print_json(&deleted)?;
        }
        Commands::Get { name, output } => {
            let content = bucket
                .get_object(&name)
                .await
                .with_context(|| format!("Failed to get '{}'", name))?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Saved {} bytes to {}", content.len(), path.display());
                }
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&content)?;
                }
            }
        }
        Commands::Exists { name } => {
            let exists = bucket
                .does_object_exist(&name)
                .await
                .with_context(|| format!("Failed to check '{}'", name))?;
            println!("{}", exists);
        }
        Commands::Multiupload { name, file } => {
            bucket
                .multiupload_file(&name, &file)
                .await
                .with_context(|| format!("Failed to upload {} to '{}'", file.display(), name))?;
            println!("Uploaded {} to {}", file.display(), name);
        }
        Commands::Sign {
            name,
            timeout,
            method,
        } => {
            let url = bucket
                .sign_url(&name, timeout, method)
                .await
                .with_context(|| format!("Failed to sign '{}'", name))?;
            println!("{}", url);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli.init_logging();

    let bucket = create_bucket(cli.to_config()?, cli.backend());
    run(&bucket, cli.command).await
}
