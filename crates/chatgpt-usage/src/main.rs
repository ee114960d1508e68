use anyhow::{anyhow, Context, Result};
use chatgpt_usage_analytics::prelude::*;
use chatgpt_usage_analytics::{HeatmapGrid, PricingProvider};
use chrono::{DateTime, Datelike, Utc};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    DefaultTerminal, Frame,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod report;
mod widgets;

use config::{load_config, save_config, UsageConfig};
use widgets::*;

#[derive(Debug, Clone, PartialEq)]
pub enum PopupType {
    ModelStats,
    Subscription,
}

#[derive(Parser, Debug)]
#[clap(author = "Red", version, about)]
struct Args {
    /// Export folder containing conversations.json, or the file itself
    export: PathBuf,

    /// Time zone used to assign messages to calendar days, e.g. Europe/Berlin
    #[arg(long = "tz")]
    tz: Option<String>,

    /// Year shown in the heatmaps
    #[arg(short = 'y', long = "year")]
    year: Option<i32>,

    /// Print the report as text instead of starting the dashboard
    #[arg(long = "print")]
    print: bool,

    /// Monthly subscription price compared against pay-per-use cost
    #[arg(long = "subscription-price")]
    subscription_price: Option<f64>,

    /// Write logs to this file (the dashboard does not log otherwise)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    #[arg(short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool, log_file: Option<&Path>, to_stderr: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if to_stderr => subscriber.with_writer(std::io::stderr).init(),
        None => {}
    }

    Ok(())
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|e| {
        anyhow!(
            "Invalid timezone '{}': {}. Example: 'UTC' or 'America/Los_Angeles'",
            name,
            e
        )
    })
}

/// The current year when it has data, else the most recent year that does.
fn default_year(analyzer: &UsageAnalyzer, timezone: Tz) -> i32 {
    let current = Utc::now().with_timezone(&timezone).year();
    let years = analyzer.years();
    if years.contains(&current) {
        current
    } else {
        years.last().copied().unwrap_or(current)
    }
}

pub struct AppState {
    pub analyzer: UsageAnalyzer,
    pub export_path: PathBuf,
    pub timezone: Tz,
    pub year: i32,
    pub year_explicit: bool,
    pub metric: HeatmapMetric,
    pub subscription_price: f64,
    pub last_update: DateTime<Utc>,
    pub is_loading: bool,
    pub spinner_state: usize,
    pub data_loaded: bool,
    pub error_message: Option<String>,
    pub active_popup: Option<PopupType>,
    pub heatmap: Option<HeatmapGrid>,
    pub model_usage: Vec<ModelUsage>,
    pub model_costs: Vec<ModelCost>,
    pub subscription: Option<SubscriptionValue>,
}

impl AppState {
    fn new(export_path: PathBuf, timezone: Tz, year: Option<i32>, subscription_price: f64) -> Self {
        Self {
            analyzer: UsageAnalyzer::new(timezone),
            export_path,
            timezone,
            year: year.unwrap_or_else(|| Utc::now().with_timezone(&timezone).year()),
            year_explicit: year.is_some(),
            metric: HeatmapMetric::default(),
            subscription_price,
            last_update: Utc::now(),
            is_loading: false,
            spinner_state: 0,
            data_loaded: false,
            error_message: None,
            active_popup: None,
            heatmap: None,
            model_usage: Vec::new(),
            model_costs: Vec::new(),
            subscription: None,
        }
    }

    fn finish_loading(&mut self, analyzer: UsageAnalyzer, result: Result<()>) {
        match result {
            Ok(()) => {
                info!(
                    messages = analyzer.message_count(),
                    conversations = analyzer.conversation_count(),
                    "export loaded"
                );
                if !self.year_explicit {
                    self.year = default_year(&analyzer, self.timezone);
                }
                self.analyzer = analyzer;
                self.data_loaded = true;
                self.error_message = None;
                self.refresh_views();
            }
            Err(e) => {
                error!(error = %e, "failed to load export");
                self.error_message = Some(format!("{:#}", e));
                self.data_loaded = false;
            }
        }

        self.is_loading = false;
        self.last_update = Utc::now();
    }

    fn refresh_views(&mut self) {
        self.model_usage = self.analyzer.model_usage();
        self.model_costs = self.analyzer.model_costs();
        self.subscription = Some(self.analyzer.subscription_value(self.subscription_price));
        self.refresh_heatmap();
    }

    fn refresh_heatmap(&mut self) {
        self.heatmap = self.analyzer.heatmap(self.year, self.metric);
    }

    fn shift_year(&mut self, delta: i32) {
        self.year += delta;
        self.year_explicit = true;
        self.refresh_heatmap();
    }

    fn cycle_metric(&mut self) {
        self.metric = self.metric.next();
        self.refresh_heatmap();
    }

    fn toggle_popup(&mut self, popup: PopupType) {
        self.active_popup = if self.active_popup.as_ref() == Some(&popup) {
            None
        } else {
            Some(popup)
        };
    }

    fn update_spinner(&mut self) {
        self.spinner_state = (self.spinner_state + 1) % 10;
    }

    pub fn get_spinner_char(&self) -> char {
        match self.spinner_state {
            0 => '⠋',
            1 => '⠙',
            2 => '⠹',
            3 => '⠸',
            4 => '⠼',
            5 => '⠴',
            6 => '⠦',
            7 => '⠧',
            8 => '⠇',
            9 => '⠏',
            _ => '⠋',
        }
    }

    pub fn get_total_cost(&self) -> f64 {
        self.model_costs.iter().map(|cost| cost.cost_usd()).sum()
    }
}

pub struct App {
    state: Arc<Mutex<AppState>>,
    pricing: PricingProvider,
    exit: bool,
}

impl App {
    pub fn new(
        export_path: PathBuf,
        timezone: Tz,
        year: Option<i32>,
        subscription_price: f64,
        pricing: PricingProvider,
    ) -> Self {
        let app_state = AppState::new(export_path, timezone, year, subscription_price);

        Self {
            state: Arc::new(Mutex::new(app_state)),
            pricing,
            exit: false,
        }
    }

    /// Parses the export on a blocking thread; the UI keeps drawing the spinner meanwhile.
    fn spawn_load(&self) {
        let (export_path, timezone) = match self.state.lock() {
            Ok(mut state) => {
                if state.is_loading {
                    return;
                }
                state.is_loading = true;
                (state.export_path.clone(), state.timezone)
            }
            Err(_) => return,
        };

        let state_clone = Arc::clone(&self.state);
        let pricing = self.pricing.clone();

        tokio::task::spawn_blocking(move || {
            let mut analyzer = UsageAnalyzer::new(timezone).with_pricing(pricing);
            let result = analyzer.load_export(&export_path);

            if let Ok(mut state) = state_clone.lock() {
                state.finish_loading(analyzer, result);
            }
        });
    }

    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.spawn_load();

        let mut tick_interval = interval(Duration::from_millis(100));

        loop {
            tick_interval.tick().await;

            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            if self.exit {
                break;
            }

            if let Ok(mut state) = self.state.lock() {
                state.update_spinner();
            }

            terminal.draw(|frame| self.draw(frame))?;
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(12),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);

        if let Ok(state) = self.state.lock() {
            HeaderWidget::render(frame, chunks[0], &state);
            HeatmapWidget::render(frame, chunks[1], &state);
            StatisticsWidget::render(frame, body[0], &state);
            CostsWidget::render(frame, body[1], &state);
            ShortcutsWidget::render(frame, chunks[3], &state);

            match &state.active_popup {
                Some(PopupType::ModelStats) => {
                    ModelPopupWidget::render(frame, area, &state);
                }
                Some(PopupType::Subscription) => {
                    SubscriptionPopupWidget::render(frame, area, &state);
                }
                None => {}
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        if let Event::Key(key_event) = event {
            if key_event.kind == KeyEventKind::Press {
                match key_event.code {
                    KeyCode::Char('q') => self.exit = true,
                    KeyCode::Char('r') => self.spawn_load(),
                    KeyCode::Left => {
                        if let Ok(mut state) = self.state.lock() {
                            state.shift_year(-1);
                        }
                    }
                    KeyCode::Right => {
                        if let Ok(mut state) = self.state.lock() {
                            state.shift_year(1);
                        }
                    }
                    KeyCode::Char('m') => {
                        if let Ok(mut state) = self.state.lock() {
                            state.cycle_metric();
                        }
                    }
                    KeyCode::Char('s') => {
                        if let Ok(mut state) = self.state.lock() {
                            state.toggle_popup(PopupType::ModelStats);
                        }
                    }
                    KeyCode::Char('v') => {
                        if let Ok(mut state) = self.state.lock() {
                            state.toggle_popup(PopupType::Subscription);
                        }
                    }
                    KeyCode::Esc => {
                        if let Ok(mut state) = self.state.lock() {
                            state.active_popup = None;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.log_file.as_deref(), args.print)?;

    let mut config = load_config().unwrap_or_else(|e| {
        eprintln!("Warning: Could not read config, using defaults: {}", e);
        UsageConfig::default()
    });

    // An explicitly given zone is validated, then remembered for next time
    if let Some(tz) = &args.tz {
        parse_timezone(tz)?;
        if config.timezone.as_deref() != Some(tz.as_str()) {
            config.timezone = Some(tz.clone());
            if let Err(e) = save_config(&config) {
                eprintln!("Warning: Could not save config: {}", e);
            }
        }
    }

    let timezone = parse_timezone(config.timezone())?;
    let subscription_price = args
        .subscription_price
        .unwrap_or_else(|| config.subscription_price());
    let pricing = config.pricing_provider();

    if args.print {
        let mut analyzer = UsageAnalyzer::new(timezone).with_pricing(pricing);
        analyzer.load_export(&args.export)?;
        let year = args.year.unwrap_or_else(|| default_year(&analyzer, timezone));
        print!("{}", report::render_report(&analyzer, year, subscription_price));
        return Ok(());
    }

    let mut terminal = ratatui::init();
    let mut app = App::new(args.export, timezone, args.year, subscription_price, pricing);

    let result = app.run(&mut terminal).await;

    ratatui::restore();

    result
}
