use std::{path::PathBuf, sync::Arc, time::Duration};

use color_eyre::{Result, eyre::WrapErr};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream},
    execute,
};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio_stream::StreamExt;

use eventdesk::{
    api::ApiClient,
    config::{Config, ConfigOverrides},
    dataset::Dataset,
    table::{BannerKind, ControllerOptions, EditRequest, RefreshBus, TableController, Viewport},
};

mod help;
mod logging;
mod subcommands;
mod util;
mod widgets;

use widgets::{DetailPopup, Popup, PopupOutcome, TableView, ViewAction, theme::Theme};

#[derive(clap::Parser)]
#[command(
    name = "eventdesk",
    version,
    about = "Terminal admin for workplace integration and occurrence records",
    long_about = None
)]
struct Cli {
    /// Increase output verbosity (-v, -vv, etc.)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Base URL of the records API
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Directory exported spreadsheets are written to
    #[arg(long, global = true, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Rows per page
    #[arg(long, global = true, value_name = "N")]
    page_size: Option<u32>,

    /// Dataset to open: integration or occurrence
    #[arg(long, global = true, default_value = "integration")]
    dataset: Dataset,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Check that the API is reachable
    Health {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
    /// Print one page of records
    List(subcommands::list::Args),
    /// Download every record matching the filter as a spreadsheet
    Export(subcommands::export::Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = <Cli as clap::Parser>::parse();
    let log_path = logging::init(cli.verbose)?;

    let config = Config::load(ConfigOverrides {
        base_url: cli.base_url,
        page_size: cli.page_size,
        export_dir: cli.export_dir,
    })?;
    tracing::info!(
        base_url = %config.base_url,
        page_size = config.page_size,
        export_dir = %config.export_dir.display(),
        log = ?log_path,
        "starting"
    );
    let client = Arc::new(ApiClient::new(&config.base_url)?);

    match cli.command {
        Some(Commands::Health { json }) => {
            let options = subcommands::health::Options { json };
            subcommands::health::command(&client, options).await
        }
        Some(Commands::List(args)) => {
            subcommands::list::command(&client, cli.dataset, &config, args).await
        }
        Some(Commands::Export(args)) => {
            subcommands::export::command(&client, cli.dataset, &config, args).await
        }
        None => App::new(client, cli.dataset, &config).run_tui().await,
    }
}

struct App {
    should_quit: bool,
    view: TableView,
    popups: Vec<Box<dyn Popup>>,
    edit_rx: UnboundedReceiver<EditRequest>,
    theme: Theme,
}

impl App {
    const FRAMES_PER_SECOND: f32 = 30.0;

    fn new(client: Arc<ApiClient>, dataset: Dataset, config: &Config) -> Self {
        let (edit_tx, edit_rx) = unbounded_channel();
        let controller = TableController::new(
            client,
            dataset,
            ControllerOptions::from(config),
            RefreshBus::new(),
            edit_tx,
        );
        let (width, height) = crossterm::terminal::size().unwrap_or((80, 24));
        let viewport = Viewport::new(i32::from(width), i32::from(height));
        Self {
            should_quit: false,
            view: TableView::new(controller, viewport),
            popups: Vec::new(),
            edit_rx,
            theme: Theme::default(),
        }
    }

    pub async fn run_tui(self) -> Result<()> {
        let terminal = ratatui::init();
        execute!(std::io::stdout(), EnableMouseCapture).wrap_err("enable mouse capture")?;
        let app_result = self.run(terminal).await;
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        ratatui::restore();
        app_result
    }

    async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.view.start();

        let period = Duration::from_secs_f32(1.0 / Self::FRAMES_PER_SECOND);
        let mut interval = tokio::time::interval(period);
        let mut events = EventStream::new();

        while !self.should_quit {
            tokio::select! {
                _ = interval.tick() => {
                    self.view.tick();
                    terminal.draw(|frame| self.render(frame))?;
                },
                Some(Ok(event)) = events.next() => self.handle_event(&event),
                event = self.view.next_event() => self.view.handle_table_event(event),
                Some(request) = self.edit_rx.recv() => {
                    tracing::debug!(dataset = %request.dataset, id = ?request.record.id(), "edit requested");
                    self.popups.push(Box::new(DetailPopup::new(&request)));
                },
            }
        }
        self.view.shutdown();
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let help_entries = match self.popups.last() {
            Some(popup) => popup.help(),
            None => self.view.help(),
        };
        let help_height = help::height(help_entries, frame.area());
        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(help_height),
        ]);
        let [title_area, body_area, help_area] = frame.area().layout(&layout);

        let title = Line::from(vec![
            Span::styled(
                "eventdesk",
                Style::default()
                    .fg(self.theme.accent())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                " · integrações e ocorrências",
                Style::default().fg(self.theme.text_muted()),
            ),
        ])
        .centered();
        frame.render_widget(title, title_area);
        help::render(help_entries, frame, help_area, &self.theme);

        self.view.render(frame, body_area, &self.theme);
        for popup in &self.popups {
            let rect = popup.rect(frame.area());
            popup.render(frame, rect, &self.theme);
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Some(popup) = self.popups.last_mut() {
            if let Some(key) = event.as_key_press_event() {
                if popup.handle_key(&key) == PopupOutcome::Dismiss {
                    self.popups.pop();
                }
                return;
            }
            if !matches!(event, Event::Resize(..)) {
                return;
            }
        }

        match self.view.handle_event(event) {
            ViewAction::None => {}
            ViewAction::Quit => self.should_quit = true,
            ViewAction::ShowPopup(popup) => self.popups.push(popup),
            ViewAction::ShowHelp => {
                let popup = help::HelpPopup::new(self.view.help_all());
                self.popups.push(Box::new(popup));
            }
            ViewAction::CopyToClipboard(text) => self.copy(text),
        }
    }

    fn copy(&mut self, text: String) {
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.view.notify(BannerKind::Info, "Caminho copiado."),
            Err(err) => {
                tracing::warn!(error = %err, "clipboard unavailable");
                self.view
                    .notify(BannerKind::Error, "Não foi possível copiar o caminho.");
            }
        }
    }
}
