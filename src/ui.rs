use anyhow::Result;
use codomi::{
    Apartment, ApartmentDraft, ApartmentStatus, ApartmentsPage, Condominium, DocumentType,
    FormPhase, MeasurementType, Notice, NoticeKind, Owner, OwnerDraft, OwnersPage, PageContext,
    ReferenceData, Selection,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_JUMP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Apartments,
    Owners,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Apartments => Page::Owners,
            Page::Owners => Page::Apartments,
        }
    }

    pub fn previous(&self) -> Self {
        self.next()
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Apartments => "Apartamentos",
            Page::Owners => "Propietarios",
        }
    }
}

/// What keystrokes currently go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    ApartmentEditor,
    OwnerEditor,
    OwnerManager,
    ConfirmDelete(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerFocus {
    Candidates,
    Linked,
}

pub struct App {
    pub store: Condominium,
    pub current_page: Page,
    pub mode: Mode,
    pub apartments: ApartmentsPage,
    pub owners: OwnersPage,
    pub apartment_state: TableState,
    pub owner_state: TableState,
    pub show_detail: bool,
    /// Focused row of the open editor
    pub field_index: usize,
    pub manager_focus: ManagerFocus,
    pub manager_state: TableState,
    pub status: Option<Notice>,
    pub should_quit: bool,
}

/// Visible apartments in section order (grouped by building)
fn ordered_apartments<'a>(page: &ApartmentsPage, store: &'a Condominium) -> Vec<&'a Apartment> {
    page.sections(store).into_values().flatten().collect()
}

/// Move a table selection, clamped (or wrapped) to `len` rows
fn step(state: &mut TableState, len: usize, delta: isize, wrap: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let last = len as isize - 1;
    let next = current + delta;
    let i = if wrap {
        if next > last {
            0
        } else if next < 0 {
            last
        } else {
            next
        }
    } else {
        next.clamp(0, last)
    };
    state.select(Some(i as usize));
}

/// Next value after `current` in `options`, wrapping around; `None` when there is nothing to pick
fn cycle<T: Clone + PartialEq>(options: &[T], current: &T, forward: bool) -> Option<T> {
    let len = options.len();
    if len == 0 {
        return None;
    }
    let index = options.iter().position(|o| o == current);
    let next = match (index, forward) {
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
        (None, _) => 0,
    };
    options.get(next).cloned()
}

impl App {
    pub fn new(store: Condominium, context: PageContext) -> Self {
        let mut apartment_state = TableState::default();
        if !store.apartments().is_empty() {
            apartment_state.select(Some(0));
        }
        let mut owner_state = TableState::default();
        if !store.owners().is_empty() {
            owner_state.select(Some(0));
        }

        Self {
            store,
            current_page: Page::Apartments,
            mode: Mode::Normal,
            apartments: ApartmentsPage::new(context.clone()),
            owners: OwnersPage::new(context),
            apartment_state,
            owner_state,
            show_detail: false,
            field_index: 0,
            manager_focus: ManagerFocus::Candidates,
            manager_state: TableState::default(),
            status: None,
            should_quit: false,
        }
    }

    pub fn selected_apartment(&self) -> Option<&Apartment> {
        let rows = ordered_apartments(&self.apartments, &self.store);
        self.apartment_state.selected().and_then(|i| rows.get(i).copied())
    }

    pub fn selected_owner(&self) -> Option<&Owner> {
        let rows = self.owners.visible(&self.store);
        self.owner_state.selected().and_then(|i| rows.get(i).copied())
    }

    fn row_count(&self) -> usize {
        match self.current_page {
            Page::Apartments => ordered_apartments(&self.apartments, &self.store).len(),
            Page::Owners => self.owners.visible(&self.store).len(),
        }
    }

    fn table_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Apartments => &mut self.apartment_state,
            Page::Owners => &mut self.owner_state,
        }
    }

    fn move_selection(&mut self, delta: isize, wrap: bool) {
        let len = self.row_count();
        step(self.table_state(), len, delta, wrap);
    }

    pub fn next(&mut self) {
        self.move_selection(1, true);
    }

    pub fn previous(&mut self) {
        self.move_selection(-1, true);
    }

    pub fn page_down(&mut self) {
        self.move_selection(PAGE_JUMP as isize, false);
    }

    pub fn page_up(&mut self) {
        self.move_selection(-(PAGE_JUMP as isize), false);
    }

    /// Filters changed: jump back to the first row
    fn reset_selection(&mut self) {
        let len = self.row_count();
        let state = self.table_state();
        state.select(if len == 0 { None } else { Some(0) });
    }

    fn report<T>(&mut self, result: codomi::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(error = %err, "action rejected");
                self.status = Some(Notice::error("Error", err.to_string()));
                None
            }
        }
    }

    // ========================================================================
    // FILTERS
    // ========================================================================

    fn building_options(&self) -> Vec<Selection<String>> {
        let mut options = vec![Selection::All];
        options.extend(
            self.store
                .buildings()
                .all()
                .iter()
                .map(|b| Selection::Only(b.id.clone())),
        );
        options
    }

    pub fn cycle_building(&mut self) {
        let options = self.building_options();
        match self.current_page {
            Page::Apartments => {
                if let Some(next) = cycle(&options, &self.apartments.filter.building, true) {
                    self.apartments.set_building(next);
                }
            }
            Page::Owners => {
                if let Some(next) = cycle(&options, &self.owners.filter.building, true) {
                    self.owners.filter.building = next;
                }
            }
        }
        self.reset_selection();
    }

    pub fn cycle_status(&mut self) {
        let mut options = vec![Selection::All];
        options.extend(ApartmentStatus::all().into_iter().map(Selection::Only));
        if let Some(next) = cycle(&options, &self.apartments.filter.status, true) {
            self.apartments.filter.status = next;
        }
        self.reset_selection();
    }

    pub fn cycle_document_type(&mut self) {
        let mut options = vec![Selection::All];
        options.extend(DocumentType::all().into_iter().map(Selection::Only));
        if let Some(next) = cycle(&options, &self.owners.filter.document_type, true) {
            self.owners.filter.document_type = next;
        }
        self.reset_selection();
    }

    pub fn clear_filters(&mut self) {
        match self.current_page {
            Page::Apartments => self.apartments.filter = Default::default(),
            Page::Owners => self.owners.filter = Default::default(),
        }
        self.reset_selection();
    }

    fn search_term_mut(&mut self) -> &mut String {
        match self.current_page {
            Page::Apartments => &mut self.apartments.filter.search_term,
            Page::Owners => &mut self.owners.filter.search_term,
        }
    }

    // ========================================================================
    // KEY HANDLING
    // ========================================================================

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.mode.clone() {
            Mode::Normal => self.handle_normal(key),
            Mode::Search => self.handle_search(key),
            Mode::ApartmentEditor => self.handle_apartment_editor(key),
            Mode::OwnerEditor => self.handle_owner_editor(key),
            Mode::OwnerManager => self.handle_owner_manager(key),
            Mode::ConfirmDelete(id) => self.handle_confirm_delete(key, &id),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        self.status = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.show_detail = !self.show_detail,
            KeyCode::Tab | KeyCode::BackTab => {
                self.current_page = if key.modifiers.contains(KeyModifiers::SHIFT)
                    || key.code == KeyCode::BackTab
                {
                    self.current_page.previous()
                } else {
                    self.current_page.next()
                };
            }
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('b') => self.cycle_building(),
            KeyCode::Char('s') if self.current_page == Page::Apartments => self.cycle_status(),
            KeyCode::Char('t') if self.current_page == Page::Owners => self.cycle_document_type(),
            KeyCode::Char('c') => self.clear_filters(),
            KeyCode::Char('n') => self.open_create(),
            KeyCode::Char('e') => self.open_edit(),
            KeyCode::Char('o') if self.current_page == Page::Apartments => self.open_owner_manager(),
            KeyCode::Char('d') => {
                let id = match self.current_page {
                    Page::Apartments => self.selected_apartment().map(|a| a.id.clone()),
                    Page::Owners => self.selected_owner().map(|o| o.id.clone()),
                };
                if let Some(id) = id {
                    self.mode = Mode::ConfirmDelete(id);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.reset_selection(),
            KeyCode::End => {
                let len = self.row_count();
                if len > 0 {
                    self.table_state().select(Some(len - 1));
                }
            }
            _ => {}
        }
    }

    fn handle_search(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                self.search_term_mut().pop();
                self.reset_selection();
            }
            KeyCode::Char(c) => {
                self.search_term_mut().push(c);
                self.reset_selection();
            }
            _ => {}
        }
    }

    fn handle_confirm_delete(&mut self, key: KeyEvent, id: &str) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('s') => {
                let message = match self.current_page {
                    Page::Apartments => {
                        let result = self.apartments.remove(&mut self.store, id);
                        self.report(result)
                            .map(|a| format!("Apartamento {} eliminado.", a.number))
                    }
                    Page::Owners => {
                        let result = self.owners.remove(&mut self.store, id);
                        self.report(result).map(|o| format!("{} eliminado.", o.name))
                    }
                };
                if let Some(message) = message {
                    self.status = Some(Notice::success("Eliminado", message));
                }
                self.mode = Mode::Normal;
                self.move_selection(0, false);
            }
            KeyCode::Char('n') | KeyCode::Esc => self.mode = Mode::Normal,
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Editors
    // ------------------------------------------------------------------------

    fn open_create(&mut self) {
        self.field_index = 0;
        match self.current_page {
            Page::Apartments => {
                self.apartments.open_create();
                self.mode = Mode::ApartmentEditor;
            }
            Page::Owners => {
                self.owners.open_create();
                self.mode = Mode::OwnerEditor;
            }
        }
    }

    fn open_edit(&mut self) {
        self.field_index = 0;
        match self.current_page {
            Page::Apartments => {
                let Some(id) = self.selected_apartment().map(|a| a.id.clone()) else {
                    return;
                };
                let result = self.apartments.open_edit(&self.store, &id);
                if self.report(result).is_some() {
                    self.mode = Mode::ApartmentEditor;
                }
            }
            Page::Owners => {
                let Some(id) = self.selected_owner().map(|o| o.id.clone()) else {
                    return;
                };
                let result = self.owners.open_edit(&self.store, &id);
                if self.report(result).is_some() {
                    self.mode = Mode::OwnerEditor;
                }
            }
        }
    }

    /// Options for apartment fields edited by cycling instead of typing
    fn apartment_choices(&self, field: &str) -> Option<Vec<String>> {
        match field {
            "buildingId" => Some(
                self.store
                    .buildings()
                    .all()
                    .iter()
                    .map(|b| b.id.clone())
                    .collect(),
            ),
            "aliquotTypeId" => {
                let mut ids = vec![String::new()];
                ids.extend(self.store.aliquot_types().all().iter().map(|a| a.id.clone()));
                Some(ids)
            }
            "measurementType" => Some(vec![
                MeasurementType::Area.as_str().to_string(),
                MeasurementType::Percentage.as_str().to_string(),
            ]),
            "status" => Some(
                ApartmentStatus::all()
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
            _ => None,
        }
    }

    fn handle_apartment_editor(&mut self, key: KeyEvent) {
        let Some(form) = self.apartments.editor.as_ref() else {
            self.mode = Mode::Normal;
            return;
        };

        if form.phase() == FormPhase::Confirming {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => {
                    let result = self.apartments.confirm_editor(&mut self.store);
                    if self.report(result).is_some() {
                        self.status = self.apartments.take_notice();
                        self.mode = Mode::Normal;
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    if let Some(form) = self.apartments.editor.as_mut() {
                        let result = form.cancel_confirmation();
                        self.report(result);
                    }
                }
                _ => {}
            }
            return;
        }

        let field = ApartmentDraft::FIELDS[self.field_index % ApartmentDraft::FIELDS.len()];
        match key.code {
            KeyCode::Esc => {
                self.apartments.close_editor(&mut self.store);
                self.mode = Mode::Normal;
            }
            KeyCode::Down => self.field_index = (self.field_index + 1) % ApartmentDraft::FIELDS.len(),
            KeyCode::Up => {
                self.field_index =
                    (self.field_index + ApartmentDraft::FIELDS.len() - 1) % ApartmentDraft::FIELDS.len()
            }
            KeyCode::Enter => {
                let result = self.apartments.submit_editor(&self.store);
                if let Some(false) = self.report(result) {
                    self.status = self.apartments.take_notice();
                }
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(options) = self.apartment_choices(field) {
                    let current = form.draft().get(field).unwrap_or_default();
                    if let Some(next) = cycle(&options, &current, key.code == KeyCode::Right) {
                        self.set_apartment_field(field, &next);
                    }
                }
            }
            KeyCode::Backspace if self.apartment_choices(field).is_none() => {
                let mut value = form.draft().get(field).unwrap_or_default();
                value.pop();
                self.set_apartment_field(field, &value);
            }
            KeyCode::Char(c) if self.apartment_choices(field).is_none() => {
                let mut value = form.draft().get(field).unwrap_or_default();
                value.push(c);
                self.set_apartment_field(field, &value);
            }
            _ => {}
        }
    }

    fn set_apartment_field(&mut self, field: &str, value: &str) {
        if let Some(form) = self.apartments.editor.as_mut() {
            let result = form.set_field(field, value);
            self.report(result);
        }
    }

    fn handle_owner_editor(&mut self, key: KeyEvent) {
        let Some(form) = self.owners.editor.as_ref() else {
            self.mode = Mode::Normal;
            return;
        };

        if form.phase() == FormPhase::Confirming {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => {
                    let result = self.owners.confirm_editor(&mut self.store);
                    if self.report(result).is_some() {
                        self.status = self.owners.take_notice();
                        self.mode = Mode::Normal;
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    if let Some(form) = self.owners.editor.as_mut() {
                        let result = form.cancel_confirmation();
                        self.report(result);
                    }
                }
                _ => {}
            }
            return;
        }

        let fields = OwnerDraft::FIELDS;
        let field = fields[self.field_index % fields.len()];
        match key.code {
            KeyCode::Esc => {
                self.owners.close_editor(&mut self.store);
                self.mode = Mode::Normal;
            }
            KeyCode::Down => self.field_index = (self.field_index + 1) % fields.len(),
            KeyCode::Up => self.field_index = (self.field_index + fields.len() - 1) % fields.len(),
            KeyCode::Enter => {
                let result = self.owners.submit_editor();
                if let Some(false) = self.report(result) {
                    self.status = self.owners.take_notice();
                }
            }
            KeyCode::Left | KeyCode::Right if field == "documentType" => {
                let next = cycle(
                    &DocumentType::all(),
                    &form.draft().document_type,
                    key.code == KeyCode::Right,
                );
                if let Some(next) = next {
                    self.set_owner_field(field, next.as_str());
                }
            }
            KeyCode::Backspace if field != "documentType" => {
                let mut value = form.draft().get(field).unwrap_or_default();
                value.pop();
                self.set_owner_field(field, &value);
            }
            KeyCode::Char(c) if field != "documentType" => {
                let mut value = form.draft().get(field).unwrap_or_default();
                value.push(c);
                self.set_owner_field(field, &value);
            }
            _ => {}
        }
    }

    fn set_owner_field(&mut self, field: &str, value: &str) {
        if let Some(form) = self.owners.editor.as_mut() {
            let result = form.set_field(field, value);
            self.report(result);
        }
    }

    // ------------------------------------------------------------------------
    // Owner manager
    // ------------------------------------------------------------------------

    fn open_owner_manager(&mut self) {
        let Some(id) = self.selected_apartment().map(|a| a.id.clone()) else {
            return;
        };
        let result = self.apartments.open_owner_manager(&self.store, &id);
        if self.report(result).is_some() {
            self.manager_focus = ManagerFocus::Candidates;
            self.manager_state.select(None);
            self.mode = Mode::OwnerManager;
        }
    }

    fn manager_rows(&self) -> Vec<String> {
        let Some(manager) = self.apartments.owner_manager.as_ref() else {
            return Vec::new();
        };
        let owners = match self.manager_focus {
            ManagerFocus::Candidates => manager.candidates(&self.store),
            ManagerFocus::Linked => manager.linked_owners(&self.store),
        };
        owners.iter().map(|o| o.id.clone()).collect()
    }

    fn handle_owner_manager(&mut self, key: KeyEvent) {
        let Some(manager) = self.apartments.owner_manager.as_mut() else {
            self.mode = Mode::Normal;
            return;
        };

        if manager.pending_unlink().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => {
                    let result = manager.confirm_unlink(&mut self.store);
                    if let Some(notice) = self.report(result).flatten() {
                        self.status = Some(notice);
                    }
                    self.manager_state.select(None);
                }
                KeyCode::Char('n') | KeyCode::Esc => manager.cancel_unlink(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => {
                self.apartments.close_owner_manager();
                self.mode = Mode::Normal;
            }
            KeyCode::Tab => {
                self.manager_focus = match self.manager_focus {
                    ManagerFocus::Candidates => ManagerFocus::Linked,
                    ManagerFocus::Linked => ManagerFocus::Candidates,
                };
                self.manager_state.select(None);
            }
            KeyCode::Down => {
                let len = self.manager_rows().len();
                step(&mut self.manager_state, len, 1, true);
            }
            KeyCode::Up => {
                let len = self.manager_rows().len();
                step(&mut self.manager_state, len, -1, true);
            }
            KeyCode::Enter if self.manager_focus == ManagerFocus::Candidates => {
                let rows = self.manager_rows();
                let Some(owner_id) = self.manager_state.selected().and_then(|i| rows.get(i)) else {
                    return;
                };
                if let Some(manager) = self.apartments.owner_manager.as_mut() {
                    let result = manager.link(&mut self.store, owner_id);
                    if let Some(notice) = self.report(result).flatten() {
                        self.status = Some(notice);
                    }
                }
                self.manager_state.select(None);
            }
            KeyCode::Char('x') | KeyCode::Delete if self.manager_focus == ManagerFocus::Linked => {
                let rows = self.manager_rows();
                let Some(owner_id) = self.manager_state.selected().and_then(|i| rows.get(i)) else {
                    return;
                };
                if let Some(manager) = self.apartments.owner_manager.as_mut() {
                    let result = manager.request_unlink(&self.store, owner_id);
                    self.report(result);
                }
            }
            KeyCode::Backspace if self.manager_focus == ManagerFocus::Candidates => {
                let mut term = manager.search_term().to_string();
                term.pop();
                manager.set_search(&term);
                self.manager_state.select(None);
            }
            KeyCode::Char(c) if self.manager_focus == ManagerFocus::Candidates => {
                let term = format!("{}{}", manager.search_term(), c);
                manager.set_search(&term);
                self.manager_state.select(None);
            }
            _ => {}
        }
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.handle_key(key);
            if app.should_quit {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_page(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_page(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);

    match app.mode.clone() {
        Mode::ApartmentEditor => render_apartment_editor(f, app),
        Mode::OwnerEditor => render_owner_editor(f, app),
        Mode::OwnerManager => render_owner_manager(f, app),
        Mode::ConfirmDelete(_) => render_confirm(
            f,
            "¿Está seguro de que desea eliminar este registro? (y/n)",
        ),
        Mode::Normal | Mode::Search => {}
    }
}

fn render_page(f: &mut Frame, area: Rect, app: &mut App) {
    match app.current_page {
        Page::Apartments => render_apartments(f, area, app),
        Page::Owners => render_owners(f, area, app),
    }
}

fn label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn status_color(status: ApartmentStatus) -> Color {
    match status {
        ApartmentStatus::Occupied => Color::Green,
        ApartmentStatus::Vacant => Color::Yellow,
        ApartmentStatus::Maintenance => Color::Red,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Apartments, Page::Owners].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    match app.current_page {
        Page::Apartments => {
            let stats = app.apartments.stats(&app.store);
            tab_spans.push(Span::styled(
                format!("Total: {}", stats.total),
                Style::default().fg(Color::White),
            ));
            tab_spans.push(Span::raw("  "));
            tab_spans.push(Span::styled(
                format!("Ocupados: {}", stats.occupied),
                Style::default().fg(Color::Green),
            ));
            tab_spans.push(Span::raw("  "));
            tab_spans.push(Span::styled(
                format!("Vacantes: {}", stats.vacant),
                Style::default().fg(Color::Yellow),
            ));
        }
        Page::Owners => {
            let stats = app.owners.stats(&app.store);
            tab_spans.push(Span::styled(
                format!("Total: {}", stats.total),
                Style::default().fg(Color::White),
            ));
            tab_spans.push(Span::raw("  "));
            tab_spans.push(Span::styled(
                format!("Cédula: {}  RIF: {}", stats.cedula, stats.rif),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" CODOMI "),
    );

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn render_apartments(f: &mut Frame, area: Rect, app: &mut App) {
    let rows_data = ordered_apartments(&app.apartments, &app.store);

    let mut previous_building: Option<&str> = None;
    let rows = rows_data.iter().map(|apt| {
        // Building name only on the first row of each section
        let building = if previous_building == Some(apt.building_name.as_str()) {
            String::new()
        } else {
            apt.building_name.clone()
        };
        previous_building = Some(apt.building_name.as_str());

        let owners = apt
            .owners
            .iter()
            .map(|o| o.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Row::new(vec![
            Cell::from(building).style(Style::default().fg(Color::Cyan)),
            Cell::from(apt.number.clone()),
            Cell::from(apt.floor.clone()),
            Cell::from(apt.measurement_label()),
            Cell::from(
                apt.aliquot_type
                    .as_ref()
                    .map(|a| a.label())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::from(truncate(&owners, 28)),
            Cell::from(apt.status.label()).style(Style::default().fg(status_color(apt.status))),
            Cell::from(format!("{:.2}", apt.monthly_fee)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Length(15),
            Constraint::Length(30),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&[
        "Edificio", "Número", "Piso", "Área", "Alícuota", "Propietarios", "Estado", "Cuota",
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Apartamentos "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.apartment_state);
}

fn render_owners(f: &mut Frame, area: Rect, app: &mut App) {
    let owners = app.owners.visible(&app.store);

    let rows = owners.iter().map(|owner| {
        let numbers = app
            .store
            .apartments_of(&owner.id)
            .unwrap_or_default()
            .iter()
            .map(|a| a.number.clone())
            .collect::<Vec<_>>()
            .join(", ");

        Row::new(vec![
            Cell::from(owner.name.clone()),
            Cell::from(owner.document_label()),
            Cell::from(owner.email.clone().unwrap_or_default()),
            Cell::from(owner.phone.clone().unwrap_or_default()),
            Cell::from(numbers),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(22),
            Constraint::Length(24),
            Constraint::Length(18),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["Nombre", "Documento", "Email", "Teléfono", "Apartamentos"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Propietarios "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.owner_state);
}

fn detail_line<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![Span::styled(label, label_style()), Span::raw(value)])
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let (title, content) = match app.current_page {
        Page::Apartments => match app.selected_apartment() {
            Some(apt) => {
                let mut lines = vec![
                    Line::from(""),
                    detail_line("  Apartamento: ", apt.number.clone()),
                    detail_line("  Edificio: ", apt.building_name.clone()),
                    detail_line("  Piso: ", apt.floor.clone()),
                    detail_line("  Área: ", apt.measurement_label()),
                    detail_line(
                        "  Alícuota: ",
                        apt.aliquot_type.as_ref().map(|a| a.label()).unwrap_or_default(),
                    ),
                    detail_line("  Estado: ", apt.status.label().to_string()),
                    detail_line("  Cuota mensual: ", format!("{:.2}", apt.monthly_fee)),
                    Line::from(""),
                    Line::from("  ─────────────────────────────────────"),
                    Line::from(vec![Span::styled(
                        "  PROPIETARIOS",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    )]),
                ];
                if apt.owners.is_empty() {
                    lines.push(Line::from("  Sin propietarios asignados"));
                }
                for owner in &apt.owners {
                    lines.push(Line::from(format!("  • {} ({})", owner.name, owner.document_number)));
                }
                (" Detalle del Apartamento ", lines)
            }
            None => (" Detalle ", vec![Line::from("No hay apartamento seleccionado")]),
        },
        Page::Owners => match app.selected_owner() {
            Some(owner) => {
                let mut lines = vec![
                    Line::from(""),
                    detail_line("  Nombre: ", owner.name.clone()),
                    detail_line("  Documento: ", owner.document_label()),
                    detail_line("  Email: ", owner.email.clone().unwrap_or_default()),
                    detail_line("  Teléfono: ", owner.phone.clone().unwrap_or_default()),
                    Line::from(""),
                    Line::from("  ─────────────────────────────────────"),
                    Line::from(vec![Span::styled(
                        "  APARTAMENTOS",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    )]),
                ];
                for apt in app.store.apartments_of(&owner.id).unwrap_or_default() {
                    lines.push(Line::from(format!("  • {} - {}", apt.building_name, apt.number)));
                }
                (" Perfil del Propietario ", lines)
            }
            None => (" Detalle ", vec![Line::from("No hay propietario seleccionado")]),
        },
    };

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title),
    );
    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(notice) = &app.status {
        let color = match notice.kind {
            NoticeKind::Success => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        status_spans.push(Span::styled(
            format!(" {}: {} ", notice.title, notice.description),
            Style::default().fg(color),
        ));
    } else {
        let (search, building, extra) = match app.current_page {
            Page::Apartments => (
                app.apartments.filter.search_term.clone(),
                app.apartments.filter.building.to_string(),
                format!("Estado: {}", app.apartments.filter.status),
            ),
            Page::Owners => (
                app.owners.filter.search_term.clone(),
                app.owners.filter.building.to_string(),
                format!("Documento: {}", app.owners.filter.document_type),
            ),
        };
        let search_style = if app.mode == Mode::Search {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        status_spans.push(Span::styled(format!(" Buscar: {} ", search), search_style));
        status_spans.push(Span::raw("| "));
        status_spans.push(Span::styled(
            format!("Edificio: {} | {} ", building, extra),
            Style::default().fg(Color::Green),
        ));
    }

    status_spans.push(Span::raw("| "));
    for (key, help) in [
        ("/", " Buscar "),
        ("b", " Edificio "),
        ("s/t", " Estado/Doc "),
        ("n/e", " Crear/Editar "),
        ("o", " Propietarios "),
        ("Tab", " Página "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(help));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Salir"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}

/// Rect centered in the frame, sized in percent
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_confirm(f: &mut Frame, prompt: &str) {
    let area = centered_rect(50, 20, f.size());
    let popup = Paragraph::new(vec![Line::from(""), Line::from(format!("  {}", prompt))]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirmar "),
    );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn form_lines<'a>(
    fields: &[&'static str],
    focused: usize,
    value: impl Fn(&str) -> String,
    error: impl Fn(&str) -> Option<String>,
) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from("")];
    for (i, field) in fields.iter().enumerate() {
        let marker = if i == focused { "→ " } else { "  " };
        let style = if i == focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            label_style()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{}: ", marker, field), style),
            Span::raw(value(field)),
        ]));
        if let Some(message) = error(field) {
            lines.push(Line::from(Span::styled(
                format!("    {}", message),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines.push(Line::from(""));
    lines
}

fn render_apartment_editor(f: &mut Frame, app: &App) {
    let Some(form) = app.apartments.editor.as_ref() else {
        return;
    };

    if form.phase() == FormPhase::Confirming {
        render_confirm(f, &format!("{} (y/n)", form.confirmation_prompt(&app.store)));
        return;
    }

    let mut lines = form_lines(
        &ApartmentDraft::FIELDS,
        app.field_index % ApartmentDraft::FIELDS.len(),
        |field| form.draft().get(field).unwrap_or_default(),
        |field| form.errors().get(field).map(str::to_string),
    );
    lines.push(Line::from(Span::styled(
        "  ↑/↓ campo  ←/→ opciones  Enter guardar  Esc cerrar",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let area = centered_rect(60, 70, f.size());
    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", form.title())),
    );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_owner_editor(f: &mut Frame, app: &App) {
    let Some(form) = app.owners.editor.as_ref() else {
        return;
    };

    if form.phase() == FormPhase::Confirming {
        render_confirm(f, &format!("{} (y/n)", form.confirmation_prompt()));
        return;
    }

    let mut lines = form_lines(
        &OwnerDraft::FIELDS,
        app.field_index % OwnerDraft::FIELDS.len(),
        |field| form.draft().get(field).unwrap_or_default(),
        |field| form.errors().get(field).map(str::to_string),
    );
    let example = form.draft().document_type.example();
    lines.push(Line::from(Span::styled(
        format!("  Formato de documento: {}", example),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "  ↑/↓ campo  ←/→ tipo de documento  Enter guardar  Esc cerrar",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let area = centered_rect(60, 60, f.size());
    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", form.title())),
    );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_owner_manager(f: &mut Frame, app: &mut App) {
    let Some(manager) = app.apartments.owner_manager.as_ref() else {
        return;
    };
    let number = app
        .store
        .apartment(manager.apartment_id())
        .map(|a| a.number.clone())
        .unwrap_or_default();

    if let Some(pending) = manager.pending_unlink() {
        let name = app
            .store
            .owner(pending.owner_id())
            .map(|o| o.name.clone())
            .unwrap_or_default();
        render_confirm(
            f,
            &format!(
                "¿Desvincular a {} del apartamento {}? (y/n)",
                name, number
            ),
        );
        return;
    }

    let area = centered_rect(70, 70, f.size());
    f.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Min(0)])
        .split(area);

    let focus_style = |focus: ManagerFocus| {
        if app.manager_focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let search = Paragraph::new(format!(" {}", manager.search_term())).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(ManagerFocus::Candidates))
            .title(format!(" Propietarios del apartamento {} - Buscar ", number)),
    );
    f.render_widget(search, chunks[0]);

    fn owner_row(o: &&Owner) -> Row<'static> {
        Row::new(vec![
            Cell::from(o.name.clone()),
            Cell::from(o.document_number.clone()),
            Cell::from(o.email.clone().unwrap_or_default()),
        ])
    }
    let widths = [
        Constraint::Length(24),
        Constraint::Length(16),
        Constraint::Min(10),
    ];

    let candidates = manager.candidates(&app.store);
    let linked = manager.linked_owners(&app.store);
    let highlight = Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD);

    let candidates_table = Table::new(candidates.iter().map(owner_row), widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(ManagerFocus::Candidates))
                .title(" Disponibles (Enter vincular) "),
        )
        .highlight_style(highlight)
        .highlight_symbol("→ ");
    let linked_table = Table::new(linked.iter().map(owner_row), widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(ManagerFocus::Linked))
                .title(" Vinculados (x desvincular, Tab cambiar) "),
        )
        .highlight_style(highlight)
        .highlight_symbol("→ ");

    let mut idle = TableState::default();
    match app.manager_focus {
        ManagerFocus::Candidates => {
            f.render_stateful_widget(candidates_table, chunks[1], &mut app.manager_state);
            f.render_stateful_widget(linked_table, chunks[2], &mut idle);
        }
        ManagerFocus::Linked => {
            f.render_stateful_widget(candidates_table, chunks[1], &mut idle);
            f.render_stateful_widget(linked_table, chunks[2], &mut app.manager_state);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codomi::Snapshot;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn create_test_app() -> App {
        App::new(Condominium::with_defaults(), PageContext::default())
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = create_test_app();

        press(&mut app, KeyCode::Up);
        assert_eq!(app.apartment_state.selected(), Some(4));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.apartment_state.selected(), Some(0));
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.apartment_state.selected(), Some(4));
    }

    #[test]
    fn test_search_and_filter_cycling() {
        let mut app = create_test_app();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "sur");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.row_count(), 2);

        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.apartments.filter.building, Selection::Only("1".to_string()));
        assert_eq!(app.row_count(), 3);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.apartments.filter.status, Selection::Only(ApartmentStatus::Occupied));
        assert_eq!(app.row_count(), 2);
    }

    #[test]
    fn test_create_apartment_through_keys() {
        let mut app = create_test_app();

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::ApartmentEditor);

        press(&mut app, KeyCode::Right); // buildingId → Torre Norte
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "103");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right); // aliquotTypeId → Tipo A
        press(&mut app, KeyCode::Enter);

        let form = app.apartments.editor.as_ref().unwrap();
        assert_eq!(form.phase(), FormPhase::Confirming);

        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.store.apartments().len(), 6);
        assert_eq!(app.status.as_ref().unwrap().title, "Apartamento creado");
    }

    #[test]
    fn test_building_field_without_buildings() {
        let store = Condominium::from_snapshot(Snapshot::from_json("{}").unwrap());
        let mut app = App::new(store, PageContext::default());

        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Left);

        assert_eq!(app.mode, Mode::ApartmentEditor);
        let form = app.apartments.editor.as_ref().unwrap();
        assert_eq!(form.draft().building_id, "");
        assert_eq!(form.phase(), FormPhase::Editing);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.apartments.filter.building, Selection::All);
    }

    #[test]
    fn test_cycle_empty_options() {
        let options: Vec<String> = Vec::new();
        assert_eq!(cycle(&options, &String::new(), true), None);
        assert_eq!(cycle(&["a", "b"], &"b", true), Some("a"));
        assert_eq!(cycle(&["a", "b"], &"a", false), Some("b"));
    }

    #[test]
    fn test_invalid_owner_form_shows_error() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Tab);

        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Jo");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::OwnerEditor);
        assert!(app.status.as_ref().unwrap().is_error());
        let form = app.owners.editor.as_ref().unwrap();
        assert!(form.errors().contains("documentNumber"));
    }

    #[test]
    fn test_owner_manager_link_and_unlink() {
        let mut app = create_test_app();
        // 301 (Torre Sur) sorts fourth
        app.apartment_state.select(Some(3));

        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.mode, Mode::OwnerManager);
        type_text(&mut app, "ana");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert!(app.store.apartment("4").unwrap().has_owner("3"));
        assert_eq!(app.status.as_ref().unwrap().title, "Propietario vinculado");

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('x'));
        // Pending until confirmed
        assert!(app.store.apartment("4").unwrap().has_owner("3"));
        press(&mut app, KeyCode::Char('y'));
        assert!(!app.store.apartment("4").unwrap().has_owner("3"));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = create_test_app();

        press(&mut app, KeyCode::Char('d'));
        assert!(matches!(app.mode, Mode::ConfirmDelete(_)));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store.apartments().len(), 5);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.store.apartments().len(), 4);
        assert!(!app.store.owner("1").unwrap().owns("1"));
    }
}
