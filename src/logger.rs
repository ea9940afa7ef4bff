use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Info } else { LevelFilter::Warn };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("quick_assist")
        .build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}
