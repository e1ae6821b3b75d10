mod surface;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use grow_editor_config::Settings;
use grow_editor_engine::{
    Config, DEFAULT_HOST, DEFAULT_PORT, EditMode, Editor, FieldPath, FieldType, HttpEditorApi,
    MoveDirection, default_options,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::Path,
    process,
    sync::Arc,
};
use surface::TerminalSurface;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Text being typed into a field. The field stays focused until the draft
/// is committed, so saves in the meantime never overwrite it.
struct Draft {
    path: FieldPath,
    text: String,
    multiline: bool,
}

struct App {
    editor: Editor<TerminalSurface>,
    rows: Vec<FieldPath>,
    list_state: ListState,
    draft: Option<Draft>,
}

impl App {
    fn new(editor: Editor<TerminalSurface>) -> Self {
        Self {
            editor,
            rows: Vec::new(),
            list_state: ListState::default(),
            draft: None,
        }
    }

    fn refresh_rows(&mut self) {
        self.rows = self
            .editor
            .document()
            .map(|document| document.field_paths(self.editor.mode()))
            .unwrap_or_default();

        let selected = match self.list_state.selected() {
            _ if self.rows.is_empty() => None,
            Some(i) => Some(i.min(self.rows.len() - 1)),
            None => Some(0),
        };
        self.list_state.select(selected);
    }

    fn select_path(&mut self, path: &[usize]) {
        if let Some(index) = self.rows.iter().position(|row| row == path) {
            self.list_state.select(Some(index));
        }
    }

    fn selected_path(&self) -> Option<FieldPath> {
        self.list_state
            .selected()
            .and_then(|index| self.rows.get(index))
            .cloned()
    }

    fn next_field(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.rows.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_field(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    async fn load(&mut self, pod_path: &str) {
        let _ = self.editor.load(pod_path).await;
        self.refresh_rows();
    }

    fn start_editing(&mut self) {
        let Some(path) = self.selected_path() else {
            return;
        };
        let Some(field) = self.editor.field(&path) else {
            return;
        };
        let Some(text) = field.text() else {
            return;
        };
        let multiline = matches!(
            field.field_type(),
            FieldType::TextArea | FieldType::Markdown | FieldType::Source
        );
        let text = text.to_string();
        self.editor.focus(&path);
        self.draft = Some(Draft {
            path,
            text,
            multiline,
        });
    }

    fn commit_draft(&mut self) {
        if let Some(draft) = self.draft.take() {
            self.editor.set_text(&draft.path, &draft.text);
            self.editor.blur(&draft.path);
        }
    }

    fn handle_draft_key(&mut self, key: KeyEvent) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => return self.commit_draft(),
            KeyCode::Enter if !draft.multiline => return self.commit_draft(),
            KeyCode::Enter => draft.text.push('\n'),
            KeyCode::Backspace => {
                draft.text.pop();
            }
            KeyCode::Char(c) => draft.text.push(c),
            _ => return,
        }
        self.editor.set_text(&draft.path, &draft.text);
    }

    fn move_selected(&mut self, direction: MoveDirection) {
        let Some(mut path) = self.selected_path() else {
            return;
        };
        if !self.editor.move_partial(&path, direction) {
            return;
        }
        if let Some(last) = path.last_mut() {
            *last = match direction {
                MoveDirection::Up => *last - 1,
                MoveDirection::Down => *last + 1,
            };
        }
        self.refresh_rows();
        self.select_path(&path);
    }

    fn remove_selected(&mut self) {
        if let Some(path) = self.selected_path()
            && self.editor.remove_item(&path).is_some()
        {
            self.refresh_rows();
        }
    }

    fn is_list(&self, path: &[usize]) -> bool {
        self.editor
            .field(path)
            .is_some_and(|field| field.field_type() == FieldType::List)
    }

    /// Append an empty item to the selected list, or to the list holding
    /// the selected item.
    fn add_list_item(&mut self) {
        let Some(mut path) = self.selected_path() else {
            return;
        };
        if !self.is_list(&path) {
            path.pop();
            if path.is_empty() || !self.is_list(&path) {
                return;
            }
        }
        if let Some(index) = self.editor.push_list_item(&path, "") {
            path.push(index);
            self.refresh_rows();
            self.select_path(&path);
            self.start_editing();
        }
    }

    /// Returns false when the user asked to quit.
    async fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.draft.is_some() {
            self.handle_draft_key(key);
            return true;
        }

        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Down | KeyCode::Char('j') => self.next_field(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_field(),
            KeyCode::Enter => self.start_editing(),
            KeyCode::Char('s') => {
                let _ = self.editor.save(true).await;
                self.refresh_rows();
            }
            KeyCode::Char('a') => {
                let enabled = !self.editor.is_autosaving();
                self.editor.set_autosave(enabled);
            }
            KeyCode::Char('m') => {
                let _ = self.editor.toggle_source().await;
                self.list_state.select(None);
                self.refresh_rows();
            }
            KeyCode::Char('r') => {
                if self.editor.has_failure() {
                    let _ = self.editor.retry().await;
                } else {
                    let _ = self.editor.reload().await;
                }
                self.refresh_rows();
            }
            KeyCode::Char('u') => self.move_selected(MoveDirection::Up),
            KeyCode::Char('d') => self.move_selected(MoveDirection::Down),
            KeyCode::Char('x') => self.remove_selected(),
            KeyCode::Char('n') => self.add_list_item(),
            _ => {}
        }
        true
    }

    async fn autosave(&mut self) {
        if let Ok(true) = self.editor.save(false).await {
            self.refresh_rows();
        }
    }
}

/// `host:port` as given on the command line.
fn parse_address(address: &str) -> Result<(String, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .with_context(|| format!("Expected host:port, got '{address}'"))?;
    let port = port
        .parse()
        .with_context(|| format!("Invalid port in '{address}'"))?;
    Ok((host.to_string(), port))
}

fn init_logging(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    // Logging to stderr would draw over the terminal UI
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Settings::config_path();

    let mut settings = match Settings::load() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    match args.len() {
        1 => {}
        2 | 3 => {
            settings.pod_path = Some(args[1].clone());
            if let Some(address) = args.get(2) {
                let (host, port) = parse_address(address)?;
                settings.host = Some(host);
                settings.port = Some(port);
            }
        }
        _ => {
            eprintln!("Usage: {} [pod-path] [host:port]", args[0]);
            process::exit(1);
        }
    }

    let Some(pod_path) = settings.pod_path.clone() else {
        eprintln!("Error: No pod path provided and none set in the config file");
        eprintln!("Usage: {} <pod-path> [host:port]", args[0]);
        eprintln!("Or set pod_path in {}", config_path.display());
        process::exit(1);
    };

    init_logging(&settings.log_path())?;
    log::info!("grow-editor starting up, config path: {}", config_path.display());

    let config = Config::with_defaults(default_options(), settings.overrides());
    let host = config.get_str("host", DEFAULT_HOST);
    let port = u16::try_from(config.get_u64("port", DEFAULT_PORT)).context("Port out of range")?;
    let api = Arc::new(HttpEditorApi::for_host(host, port)?);
    let editor = Editor::new(api, TerminalSurface::default(), settings.overrides());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(editor);
    app.load(&pod_path).await;

    // Main loop
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

enum Wake {
    Autosave,
    Terminal(Event),
    Closed,
}

async fn run_app(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventStream::new();
    loop {
        terminal.draw(|f| ui(f, app))?;

        let wake = tokio::select! {
            _ = app.editor.wait_autosave() => Wake::Autosave,
            event = events.next() => match event {
                Some(event) => Wake::Terminal(event?),
                None => Wake::Closed,
            },
        };

        match wake {
            Wake::Autosave => app.autosave().await,
            Wake::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if !app.handle_key(key).await {
                    return Ok(());
                }
            }
            Wake::Terminal(_) => {}
            Wake::Closed => return Ok(()),
        }
    }
}

fn field_line(app: &App, path: &[usize]) -> Line<'static> {
    let Some(field) = app.editor.field(path) else {
        return Line::from("");
    };
    let indent = "  ".repeat(path.len().saturating_sub(1));
    let label = field.label().unwrap_or(field.key()).to_string();
    let value = match app.draft.as_ref() {
        Some(draft) if draft.path == path => format!("{}▏", draft.text.replace('\n', "⏎")),
        _ => match field.text() {
            Some(text) => text.lines().next().unwrap_or_default().to_string(),
            None if field.is_pending() => "(waiting for partials)".to_string(),
            None => format!("[{} item(s)]", field.children().len()),
        },
    };

    let mut spans = vec![
        Span::raw(indent),
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(": "),
        Span::raw(value),
    ];
    if !field.is_clean() {
        spans.push(Span::styled(" *", Style::default().fg(Color::Red)));
    }
    Line::from(spans)
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    let surface = app.editor.surface();
    let mode = match app.editor.mode() {
        EditMode::Fields => "fields",
        EditMode::Source => "source",
    };
    let header = Line::from(vec![
        Span::raw(surface.location.clone().unwrap_or_default()),
        Span::raw(format!(" | mode: {mode}")),
        Span::raw(format!(
            " | autosave: {}",
            if app.editor.is_autosaving() { "on" } else { "off" }
        )),
        Span::raw(if surface.saving { " | saving..." } else { "" }),
    ]);
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title("Grow Editor")),
        rows[0],
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|path| ListItem::new(field_line(app, path)))
        .collect();
    let fields = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Fields"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(fields, body[0], &mut app.list_state);

    let surface = app.editor.surface();
    let mut detail = vec![Line::from(format!(
        "Preview: {}",
        surface.preview_url.as_deref().unwrap_or("(none)")
    ))];
    if surface.preview_reloads > 0 {
        detail.push(Line::from(format!("Reloaded {} time(s)", surface.preview_reloads)));
    }
    detail.push(Line::from(""));
    if let Some(field) = app.selected_path().and_then(|path| app.editor.field(&path)) {
        detail.extend(
            field
                .text()
                .unwrap_or_default()
                .lines()
                .map(|line| Line::from(line.to_string())),
        );
    }
    f.render_widget(
        Paragraph::new(detail)
            .block(Block::default().borders(Borders::ALL).title("Preview"))
            .wrap(Wrap { trim: false }),
        body[1],
    );

    let status = match (&surface.error, app.draft.is_some()) {
        (Some(error), _) => Line::from(Span::styled(
            format!("{error} (r: retry)"),
            Style::default().fg(Color::Red),
        )),
        (None, true) => Line::from("Editing | Esc: Done | Enter: Newline/Done"),
        (None, false) => Line::from(vec![
            Span::raw("q: Quit | ↑/k ↓/j: Select | Enter: Edit | s: Save | "),
            Span::raw("a: Autosave | m: Mode | r: Reload | u/d: Move | x: Remove | n: New item"),
        ]),
    };
    f.render_widget(Paragraph::new(status).block(Block::default()), rows[2]);
}
