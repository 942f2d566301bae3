use masklens::{
    camera::Camera,
    common::{Config, DevMode, MaskLensError},
    core::{admin, guard, AccessState, AdminAnalytics, CapturePipeline, HistoryAggregator, WeeklyGraph},
    service::ApiClient,
    storage::{Role, SessionStore},
};

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "masklens")]
#[command(about = "MaskLens emotion tracking client")]
struct Cli {
    /// Enable development mode (saves data locally for testing)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        #[arg(short, long)]
        fullname: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the current session
    Whoami,
    /// List available cameras
    DetectCamera,
    /// Open the camera and grab a test frame
    TestCamera,
    /// Capture a photo and submit it for classification
    Capture,
    /// Show your recent emotion history
    History {
        /// Number of recent records to show
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
    /// Show the weekly summary
    Weekly,
    /// Administrative commands (requires admin privileges)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Overview counts and recent registrations
    Overview,
    /// List all user accounts
    Users,
    /// Create a user account
    CreateUser {
        #[arg(short, long)]
        fullname: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// "user" or "admin"
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Delete a user account (cascades that user's records server-side)
    DeleteUser {
        #[arg(short, long)]
        id: i64,
    },
    /// List all emotion records
    Emotions,
    /// Delete an emotion record
    DeleteEmotion {
        #[arg(short, long)]
        id: i64,
    },
    /// Analytics rollups (registrations, activity, top users)
    Stats,
    /// Toggle the server's mask detection logic
    ToggleMaskLogic,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let dev_mode = DevMode::new(cli.dev)?;
    let config = Config::load_or_default()?;
    let store = SessionStore::new_with_dev_mode(&dev_mode)?;
    let client = ApiClient::new(&config, store)?;

    match cli.command {
        Commands::Register { fullname, email, password } => {
            match client.register(&fullname, &email, &password) {
                Ok(()) => println!("✅ Registered successfully! You can now log in."),
                Err(MaskLensError::Validation(msg)) => println!("❌ {}", msg),
                Err(MaskLensError::InvalidResponse(msg)) => println!("❌ Error: {}", msg),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Login { email, password } => {
            match client.login(&email, &password) {
                Ok(login) => {
                    let name = login.fullname.as_deref().unwrap_or("User");
                    println!("✅ Welcome {}!", name);
                    if login.role.as_deref() == Some("admin") {
                        println!("   Admin commands are available: masklens admin --help");
                    }
                }
                Err(MaskLensError::Validation(msg)) => println!("❌ {}", msg),
                Err(MaskLensError::InvalidResponse(msg)) => println!("❌ Error: {}", msg),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Logout => {
            client.logout()?;
            println!("Logged out.");
        }
        Commands::Whoami => match client.store().session() {
            Some(session) => {
                println!("Logged in as: {} ({})", session.fullname, session.role);
            }
            None => println!("Not logged in."),
        },
        Commands::DetectCamera => {
            println!("🔍 Detecting available cameras...\n");

            let cameras = Camera::list_all_cameras()?;
            if cameras.is_empty() {
                println!("❌ No cameras found!");
                println!("\nTroubleshooting:");
                println!("  1. Check if a camera is connected");
                println!("  2. Ensure you have permission to access /dev/video*");
                return Ok(());
            }

            for (index, name, features) in &cameras {
                println!("📷 /dev/video{}: {}", index, name);
                for feature in features {
                    println!("   - {}", feature);
                }
                println!();
            }

            match Camera::detect_camera() {
                Ok(index) => {
                    println!("✅ Auto-detected camera: /dev/video{}", index);
                    println!("\nThis is used when device_index = 999 (auto-detect)");
                }
                Err(e) => println!("⚠️  {}", e),
            }
        }
        Commands::TestCamera => {
            println!("Testing camera...");
            let mut camera = Camera::new(&config.camera)?;
            let frame = camera.capture_frame()?;
            let png = Camera::encode_png(&frame)?;
            let path = dev_mode.get_capture_path("test");
            std::fs::write(&path, &png)?;
            println!("✅ Captured {}x{} frame -> {}", frame.width(), frame.height(), path.display());
        }
        Commands::Capture => {
            run_capture(&client, &config, &dev_mode)?;
        }
        Commands::History { limit } => {
            let mut history = HistoryAggregator::new();
            if let Err(e) = history.refresh(&client) {
                return handle_protected_failure(e);
            }

            let summary = history.weekly_summary(chrono::Utc::now());
            println!("Total predictions: {}", history.records().len());
            println!("Last 7 days: {} total, {} Happy, {} Sad", summary.total, summary.happy, summary.sad);

            println!("\nRecent history:");
            if history.records().is_empty() {
                println!("  No predictions yet");
            }
            for record in history.records().iter().take(limit) {
                println!("  [{}] {} - {}", record.id, record.emotion, record.timestamp);
            }
        }
        Commands::Weekly => {
            let raw = match client.weekly_summary() {
                Ok(raw) => raw,
                Err(e) => return handle_protected_failure(e),
            };
            let graph = WeeklyGraph::from_response(raw);

            println!("📊 Weekly Summary (Last 7 Days)");
            if graph.is_empty() {
                println!("\nNo data yet. Capture at least one emotion in the last 7 days to see your trend.");
                return Ok(());
            }

            for (date, counts) in &graph.daily_graph {
                println!("  {}: Happy {}, Sad {}", date, counts.happy, counts.sad);
            }
            match graph.most_frequent {
                Some(kind) => println!("\nMost frequent: {}", kind),
                None => println!("\nNo clear trend this week."),
            }
            if let Some(quote) = &graph.quote {
                println!("💬 \"{}\"", quote);
            }
        }
        Commands::Admin { command } => {
            // Server-verified privilege check before any admin call
            match guard::check_admin_access(&client) {
                AccessState::Authorized => run_admin(&client, command)?,
                AccessState::Forbidden => {
                    println!("❌ Access denied: Admin privileges required");
                }
                AccessState::Unauthenticated => {
                    println!("Session expired or not logged in. Please login first.");
                }
                AccessState::Checking => unreachable!("guard returns a terminal state"),
            }
        }
    }

    Ok(())
}

fn run_capture(client: &ApiClient, config: &Config, dev_mode: &DevMode) -> Result<()> {
    let mut pipeline = CapturePipeline::new();
    let mut history = HistoryAggregator::new();

    println!("📸 Opening camera...");
    pipeline.open_device(&config.camera)?;

    println!("📷 Capturing and sending for analysis...");
    let outcome = pipeline.capture_and_submit(client, &mut history);

    if let Some(result) = pipeline.pending() {
        println!("\nPredicted Emotion: {}", result.label);
        if !result.label.is_error() {
            println!("Mask Status: {}", result.mask_state);
            if result.faces_detected > 1 {
                println!(
                    "👥 {} faces detected - the largest face was analyzed",
                    result.faces_detected
                );
            }

            let path = dev_mode.get_capture_path("capture");
            std::fs::write(&path, result.display_image())?;
            println!("Saved snapshot -> {}", path.display());

            let summary = history.weekly_summary(chrono::Utc::now());
            println!(
                "This week: {} total, {} Happy, {} Sad",
                summary.total, summary.happy, summary.sad
            );
        }
    }

    pipeline.close_device();

    match outcome {
        Ok(()) => Ok(()),
        Err(MaskLensError::Unauthenticated) => {
            println!("\nPlease login first: masklens login");
            Ok(())
        }
        Err(MaskLensError::Network(e)) => {
            println!("\nNetwork error: {}. Re-capture to try again.", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_admin(client: &ApiClient, command: AdminCommands) -> Result<()> {
    match command {
        AdminCommands::Overview => {
            let dashboard = client.admin_dashboard()?;
            println!("🛡️  Admin Overview");
            println!("  Total users:    {}", dashboard.total_users);
            println!("  Total emotions: {}", dashboard.total_emotions);
            println!("  Happy:          {}", admin::label_count(&dashboard, "Happy"));
            println!("  Sad:            {}", admin::label_count(&dashboard, "Sad"));

            println!("\nRecent users:");
            for user in dashboard.recent_users.iter().take(5) {
                println!("  {} <{}> ({})", user.fullname, user.email, user.created_at);
            }
        }
        AdminCommands::Users => {
            let users = client.admin_users()?;
            println!("{:<5} {:<25} {:<30} {:<8} {}", "ID", "Name", "Email", "Role", "Created");
            for user in &users {
                let deletable = if admin::can_delete_user(user) { "" } else { " (protected)" };
                println!(
                    "{:<5} {:<25} {:<30} {:<8} {}{}",
                    user.id, user.fullname, user.email, user.role, user.created_at, deletable
                );
            }
        }
        AdminCommands::CreateUser { fullname, email, password, role } => {
            let role = match role.as_str() {
                "user" => Role::User,
                "admin" => Role::Admin,
                other => {
                    println!("❌ Role must be 'user' or 'admin', got '{}'", other);
                    return Ok(());
                }
            };
            match client.admin_create_user(&fullname, &email, &password, role) {
                Ok(()) => println!("✅ User created successfully"),
                Err(MaskLensError::Validation(msg)) => println!("❌ {}", msg),
                Err(MaskLensError::InvalidResponse(msg)) => println!("❌ Error: {}", msg),
                Err(e) => return Err(e.into()),
            }
        }
        AdminCommands::DeleteUser { id } => {
            let users = client.admin_users()?;
            match users.iter().find(|u| u.id == id) {
                None => println!("❌ No user with id {}", id),
                Some(user) if !admin::can_delete_user(user) => {
                    println!("❌ Admin accounts cannot be deleted");
                }
                Some(user) => {
                    client.admin_delete_user(user.id)?;
                    println!("✅ User deleted (their emotion records are removed as well)");
                }
            }
        }
        AdminCommands::Emotions => {
            let emotions = client.admin_emotions()?;
            println!("{:<5} {:<25} {:<30} {:<8} {}", "ID", "User", "Email", "Emotion", "Timestamp");
            for record in &emotions {
                println!(
                    "{:<5} {:<25} {:<30} {:<8} {}",
                    record.id,
                    record.fullname.as_deref().unwrap_or("-"),
                    record.email.as_deref().unwrap_or("-"),
                    record.emotion,
                    record.timestamp
                );
            }
        }
        AdminCommands::DeleteEmotion { id } => {
            client.admin_delete_emotion(id)?;
            println!("✅ Emotion record deleted");
        }
        AdminCommands::Stats => {
            let raw = client.admin_stats()?;
            let analytics = AdminAnalytics::shape(&raw);

            println!("📈 Monthly User Registrations");
            for entry in &analytics.monthly_users {
                println!("  {}: {}", entry.month, entry.count);
            }

            println!("\n📅 Daily Activity (Last 30 Days)");
            for entry in &analytics.daily_activity {
                println!("  {}: {}", entry.date, entry.count);
            }

            println!("\n🏆 Most Active Users");
            for (rank, user) in analytics.top_users.iter().enumerate() {
                println!(
                    "  #{} {} <{}> - {} emotions",
                    rank + 1,
                    user.fullname,
                    user.email,
                    user.emotion_count
                );
            }
        }
        AdminCommands::ToggleMaskLogic => {
            let resp = client.toggle_mask_logic()?;
            println!("🔧 Mask detection logic toggled!");
            println!("New logic: {}", resp.current_logic);
            println!("Try taking a photo with a mask to test.");
        }
    }
    Ok(())
}

/// Uniform handling for protected calls made directly from the CLI: a 401
/// already cleared the session inside the client, so only the routing
/// message is left to print here.
fn handle_protected_failure(e: MaskLensError) -> Result<()> {
    match e {
        MaskLensError::Unauthenticated => {
            println!("Session expired or not logged in. Please login first: masklens login");
            Ok(())
        }
        MaskLensError::Forbidden => {
            println!("❌ Access denied: Admin privileges required");
            Ok(())
        }
        MaskLensError::InvalidResponse(msg) => {
            println!("❌ Error: {}", msg);
            Ok(())
        }
        other => Err(other.into()),
    }
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}
