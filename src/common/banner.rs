const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

macro_rules! env_or {
    ($key:literal, $default:literal) => {
        option_env!($key).unwrap_or($default)
    };
}

pub struct BannerInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub branch: &'static str,
    pub commit: &'static str,
    pub profile: &'static str,
}

impl Default for BannerInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build_time: env_or!("BUILD_TIME", "unknown"),
            branch: env_or!("GIT_BRANCH", "unknown"),
            commit: env_or!("GIT_COMMIT", "unknown"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

pub fn print_banner(info: &BannerInfo) {
    println!();
    println!("{GREEN}                         __          __    _     __{RESET}");
    println!("{GREEN}   ____ ___  __  _______/ /_  ____ _/ /_  (_)___/ /{RESET}");
    println!("{GREEN}  / __ `__ \\/ / / / ___/ __ \\/ __ `/ __ \\/ / __  / {RESET}");
    println!("{GREEN} / / / / / / /_/ (__  ) / / / /_/ / / / / / /_/ /  {RESET}");
    println!("{GREEN}/_/ /_/ /_/\\__,_/____/_/ /_/\\__,_/_/ /_/_/\\__,_/   {RESET}");
    println!("{DIM}========================================{RESET}");
    println!();

    print_row("Version", info.version, CYAN);
    print_row("Build time", &human_build_time(info.build_time), RESET);
    print_row("Branch", info.branch, RESET);
    print_row("Commit", info.commit, RESET);
    print_row("Profile", info.profile, RESET);
    println!();
}

fn print_row(label: &str, value: &str, color: &str) {
    println!("{BOLD}{:>12}{RESET}  {color}{}{RESET}", label, value);
}

/// BUILD_TIME is unix millis injected by build.rs.
fn human_build_time(millis: &str) -> String {
    millis
        .parse::<i128>()
        .ok()
        .and_then(|ms| time::OffsetDateTime::from_unix_timestamp_nanos(ms * 1_000_000).ok())
        .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| "unknown".to_string())
}
