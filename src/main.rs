use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};

use taletype::app::App;
use taletype::config::Config;
use taletype::engine::Phase;
use taletype::event::{AppEvent, EventHandler};
use taletype::oracle::offline::OfflineOracle;
use taletype::oracle::{SceneOracle, StoryOracle};
use taletype::ui::components::quest_panel::QuestPanel;
use taletype::ui::components::stats_bar::StatsBar;
use taletype::ui::components::story_panel::{ScenePanel, StoryPanel};
use taletype::ui::components::typing_area::TypingArea;
use taletype::ui::layout::{self, AppLayout};
use taletype::ui::theme::Theme;

#[derive(Parser)]
#[command(name = "taletype", version, about = "Terminal typing game where the story writes itself as you type")]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Starting lives (1-5)")]
    lives: Option<u8>,

    #[arg(long, help = "Write logs to this file instead of the default")]
    log_file: Option<String>,

    #[arg(long, help = "Seed for the built-in story oracle")]
    seed: Option<u64>,

    #[arg(long, help = "List bundled themes and exit")]
    list_themes: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_themes {
        for name in Theme::available_themes() {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_default();
    if !Config::config_path().exists() {
        // First run: leave an editable config behind.
        let _ = config.save();
    }
    if let Some(lives) = cli.lives {
        config.starting_lives = lives;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }

    init_logging(Path::new(&config.log_file))?;
    log::info!("taletype starting up");

    let theme: &'static Theme = Box::leak(Box::new(Theme::load(&config.theme).unwrap_or_else(|| {
        log::warn!("unknown theme {}, using the default", config.theme);
        Theme::default()
    })));

    let oracle = Arc::new(OfflineOracle::new(cli.seed, config.oracle_latency())?);
    let mut events = EventHandler::new(config.tick_rate());
    let mut app = App::new(config, theme, Arc::clone(&oracle), oracle, events.sender());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        log::error!("exiting on error: {err:?}");
        eprintln!("Error: {err:?}");
    }
    log::info!("taletype shutting down");

    Ok(())
}

async fn run_app<S: StoryOracle, I: SceneOracle>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S, I>,
    events: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next().await? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => app.tick(Instant::now()),
            AppEvent::Resize(_, _) => {}
            AppEvent::Session(event) => app.apply(event),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key<S: StoryOracle, I: SceneOracle>(app: &mut App<S, I>, key: KeyEvent) {
    // Only process Press events, ignore Repeat/Release
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter if app.can_restart() => app.restart(),
        // No corrections: typed text is final.
        KeyCode::Backspace => {}
        KeyCode::Char(ch) => app.type_char(ch),
        _ => {}
    }
}

fn render<S: StoryOracle, I: SceneOracle>(frame: &mut ratatui::Frame, app: &App<S, I>) {
    let area = frame.area();
    let colors = &app.theme.colors;
    let engine = &app.engine;

    frame.render_widget(Block::default().style(Style::default().bg(colors.bg())), area);

    let app_layout = AppLayout::new(area);

    let stats = StatsBar::new(engine.stats(), engine.lives(), engine.score(), engine.streak(), app.theme)
        .toast(app.toast().map(|t| t.points));
    frame.render_widget(stats, app_layout.header);

    match (engine.phase(), engine.segment()) {
        (Phase::ReadyToType | Phase::Typing | Phase::GameOver, Some(segment)) => {
            frame.render_widget(TypingArea::new(segment, app.theme), app_layout.typing);
        }
        (phase, _) => {
            let message = match phase {
                Phase::Loading | Phase::SegmentComplete => "The story continues...",
                _ => engine
                    .notice()
                    .unwrap_or("Press Enter to begin your story."),
            };
            let placeholder = Paragraph::new(Span::styled(
                message,
                Style::default().fg(colors.text_pending()).add_modifier(Modifier::ITALIC),
            ))
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(" Story ")
                    .border_style(Style::default().fg(colors.border())),
            );
            frame.render_widget(placeholder, app_layout.typing);
        }
    }

    frame.render_widget(StoryPanel::new(engine.history(), app.theme), app_layout.story);
    frame.render_widget(QuestPanel::new(engine.quests(), app.theme), app_layout.quests);
    frame.render_widget(
        ScenePanel::new(engine.scene(), engine.scene_pending(), app.theme),
        app_layout.scene,
    );

    let hints: &[&str] = if app.can_restart() {
        &["[Enter] Start", "[Esc] Quit"]
    } else {
        &["Type the story", "Blanks take any word", "[Esc] Quit"]
    };
    let footer_text = layout::pack_hint_lines(hints, app_layout.footer.width as usize)
        .into_iter()
        .next()
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            footer_text,
            Style::default().fg(colors.text_pending()),
        ))),
        app_layout.footer,
    );

    if engine.phase() == Phase::GameOver {
        render_game_over(frame, app);
    }
}

fn render_game_over<S: StoryOracle, I: SceneOracle>(frame: &mut ratatui::Frame, app: &App<S, I>) {
    let colors = &app.theme.colors;
    let engine = &app.engine;
    let stats = engine.stats();
    let popup = layout::centered_rect(40, 30, frame.area());

    let lines = vec![
        Line::from(Span::styled(
            "The End",
            Style::default().fg(colors.error()).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "Score {}  |  {} segments",
            engine.score(),
            engine.history().len()
        )),
        Line::from(format!(
            "WPM {:.0}  |  Accuracy {:.1}%",
            stats.wpm, stats.accuracy
        )),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter] New story  [Esc] Quit",
            Style::default().fg(colors.text_pending()),
        )),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).centered().block(
            Block::bordered()
                .border_style(Style::default().fg(colors.border_focused()))
                .style(Style::default().bg(colors.bg()).fg(colors.fg())),
        ),
        popup,
    );
}
