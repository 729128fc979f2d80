use crate::aggregate::{self, UpsertMode, coerce_entry_value, parse_form_number};
use crate::errors::AppError;
use crate::grid::generate_grid_now;
use crate::models::{
    ClassifiedCell, EditEntryRequest, EntryRequest, EntryResponse, GridQuery, GridResponse,
    Habit, HabitChanges, HabitForm, HistoryQuery, ImportResponse, IndexQuery, Levels, LogEntry,
    LogForm, NewHabit, PreferencesRequest, TargetRequest, TimerResponse,
};
use crate::state::AppState;
use crate::store::{Action, Applied, HabitStore};
use crate::ticker;
use crate::timer::FocusTimer;
use crate::transfer::{self, EXPORT_FILE_NAME};
use crate::ui::render_index;
use axum::{
    extract::{Form, Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    Json,
};
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Html<String> {
    let now = Local::now();
    let mut store = state.store.lock().await;
    ticker::refresh(&mut store);
    Html(render_index(
        store.get(),
        query.habit.as_deref(),
        query.window.unwrap_or_default(),
        now,
    ))
}

pub async fn list_habits(State(state): State<AppState>) -> Json<Vec<Habit>> {
    let store = state.store.lock().await;
    Json(store.get().habits.clone())
}

pub async fn get_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Habit>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(find_habit(&store, &id)?.clone()))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<NewHabit>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let mut store = state.store.lock().await;
    let id = create(&mut store, payload)?;
    Ok((StatusCode::CREATED, Json(find_habit(&store, &id)?.clone())))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<HabitChanges>,
) -> Result<Json<Habit>, AppError> {
    let mut store = state.store.lock().await;
    store.dispatch(Action::UpdateHabit {
        id: id.clone(),
        changes,
    })?;
    Ok(Json(find_habit(&store, &id)?.clone()))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    store.dispatch(Action::DeleteHabit { id: id.clone() })?;
    info!("deleted habit {id}");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<EntryRequest>,
) -> Result<Json<EntryResponse>, AppError> {
    let date = payload.date.unwrap_or_else(today);
    let value = coerce_entry_value(&payload.value);
    let mut store = state.store.lock().await;
    let applied = store.dispatch(Action::LogEntry {
        habit_id: id,
        date,
        value,
        mode: payload.mode,
    })?;
    Ok(Json(entry_response(applied)?))
}

pub async fn edit_entry(
    State(state): State<AppState>,
    Path((id, original)): Path<(String, NaiveDate)>,
    Json(payload): Json<EditEntryRequest>,
) -> Result<Json<EntryResponse>, AppError> {
    let mut store = state.store.lock().await;
    let applied = store.dispatch(Action::EditEntry {
        habit_id: id,
        original,
        date: payload.date.unwrap_or(original),
        value: coerce_entry_value(&payload.value),
    })?;
    Ok(Json(entry_response(applied)?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((id, date)): Path<(String, NaiveDate)>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    store.dispatch(Action::RemoveEntry { habit_id: id, date })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let store = state.store.lock().await;
    let habit = find_habit(&store, &id)?;
    Ok(Json(aggregate::history(&habit.log, &query.search)))
}

pub async fn get_grid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GridQuery>,
) -> Result<Json<GridResponse>, AppError> {
    let store = state.store.lock().await;
    let habit = find_habit(&store, &id)?;
    let grid = generate_grid_now(&habit.log, query.window);
    let cells = grid
        .cells
        .iter()
        .map(|cell| ClassifiedCell::new(cell, &habit.levels))
        .collect();

    Ok(Json(GridResponse {
        habit_id: habit.id.clone(),
        window: query.window,
        start: grid.start,
        end: grid.end,
        total_weeks: grid.total_weeks,
        month_labels: grid.month_labels,
        cells,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerCommand {
    Start,
    Pause,
    Reset,
    Log,
}

impl TimerCommand {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "start" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "reset" => Ok(Self::Reset),
            "log" => Ok(Self::Log),
            other => Err(AppError::bad_request(format!(
                "unknown timer command '{other}'"
            ))),
        }
    }
}

pub async fn get_timer(State(state): State<AppState>) -> Json<TimerResponse> {
    let mut store = state.store.lock().await;
    let logged = ticker::refresh(&mut store).and_then(logged_minutes);
    let response = timer_response(&store.get().timer, logged);
    let running = store.get().timer.is_running();
    drop(store);
    ticker::sync(&state, running);
    Json(response)
}

pub async fn timer_command(
    State(state): State<AppState>,
    Path(command): Path<String>,
) -> Result<Json<TimerResponse>, AppError> {
    let command = TimerCommand::parse(&command)?;
    Ok(Json(run_timer_command(&state, command).await?))
}

pub async fn set_timer_target(
    State(state): State<AppState>,
    Json(payload): Json<TargetRequest>,
) -> Result<Json<TimerResponse>, AppError> {
    let minutes = coerce_entry_value(&payload.minutes);
    let mut store = state.store.lock().await;
    store.dispatch(Action::TimerSetTarget { minutes })?;
    let logged = ticker::refresh(&mut store).and_then(logged_minutes);
    let response = timer_response(&store.get().timer, logged);
    let running = store.get().timer.is_running();
    drop(store);
    ticker::sync(&state, running);
    Ok(Json(response))
}

async fn run_timer_command(
    state: &AppState,
    command: TimerCommand,
) -> Result<TimerResponse, AppError> {
    let now = Local::now();
    let mut store = state.store.lock().await;
    let caught_up = ticker::refresh(&mut store).and_then(logged_minutes);

    let action = match command {
        TimerCommand::Start => Action::TimerStart { now },
        TimerCommand::Pause => Action::TimerPause { now },
        TimerCommand::Reset => Action::TimerReset,
        TimerCommand::Log => Action::TimerLog { now },
    };
    let applied = store.dispatch(action)?;
    ticker::report(&applied);

    let response = timer_response(&store.get().timer, logged_minutes(applied).or(caught_up));
    let running = store.get().timer.is_running();
    drop(store);
    ticker::sync(state, running);
    Ok(response)
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Json(payload): Json<PreferencesRequest>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    if let Some(id) = payload.active_habit_id {
        store.dispatch(Action::SelectHabit { id })?;
    }
    if let Some(view) = payload.active_view {
        store.dispatch(Action::SetView(view))?;
    }
    if let Some(tab) = payload.active_tab {
        store.dispatch(Action::SetTab(tab))?;
    }
    if let Some(theme) = payload.theme {
        store.dispatch(Action::SetTheme(theme))?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_data(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    let body = transfer::export_json(store.get())?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        body,
    ))
}

pub async fn import_data(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    let payload = transfer::parse_import(&body).inspect_err(|err| {
        warn!("rejected import: {err}");
    })?;
    let count = payload.habit_count();

    let mut store = state.store.lock().await;
    store.dispatch(Action::Import(payload))?;
    info!("imported {count} habits");
    Ok(Json(ImportResponse {
        habits: count,
        active_habit_id: store.get().active_habit_id.clone(),
    }))
}

pub async fn create_habit_form(
    State(state): State<AppState>,
    Form(form): Form<HabitForm>,
) -> Result<Redirect, AppError> {
    let habit = NewHabit {
        name: form.name,
        unit: form.unit,
        use_timer: form.use_timer.is_some(),
        levels: Levels {
            low: parse_form_number(&form.low),
            medium: parse_form_number(&form.medium),
            high: parse_form_number(&form.high),
        },
    };
    let mut store = state.store.lock().await;
    create(&mut store, habit)?;
    Ok(Redirect::to("/"))
}

pub async fn log_entry_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<LogForm>,
) -> Result<Redirect, AppError> {
    let value = coerce_entry_value(&serde_json::Value::String(form.value));
    let mut store = state.store.lock().await;
    store.dispatch(Action::LogEntry {
        habit_id: id.clone(),
        date: form.date,
        value,
        mode: UpsertMode::Accumulate,
    })?;
    Ok(Redirect::to(&format!("/?habit={id}")))
}

pub async fn delete_habit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let mut store = state.store.lock().await;
    store.dispatch(Action::DeleteHabit { id: id.clone() })?;
    info!("deleted habit {id}");
    Ok(Redirect::to("/"))
}

pub async fn timer_command_form(
    State(state): State<AppState>,
    Path(command): Path<String>,
) -> Result<Redirect, AppError> {
    let command = TimerCommand::parse(&command)?;
    run_timer_command(&state, command).await?;
    Ok(Redirect::to("/"))
}

fn create(store: &mut HabitStore, habit: NewHabit) -> Result<String, AppError> {
    match store.dispatch(Action::CreateHabit(habit))? {
        Applied::HabitCreated(id) => {
            info!("created habit {id}");
            Ok(id)
        }
        other => Err(AppError::bad_request(format!(
            "unexpected outcome creating habit: {other:?}"
        ))),
    }
}

fn find_habit<'a>(store: &'a HabitStore, id: &str) -> Result<&'a Habit, AppError> {
    store
        .get()
        .habit(id)
        .ok_or_else(|| AppError::not_found(format!("habit not found: {id}")))
}

fn entry_response(applied: Applied) -> Result<EntryResponse, AppError> {
    match applied {
        Applied::EntryWritten {
            habit_id,
            date,
            value,
        } => Ok(EntryResponse {
            habit_id,
            date,
            value,
        }),
        other => Err(AppError::bad_request(format!(
            "unexpected outcome writing entry: {other:?}"
        ))),
    }
}

fn logged_minutes(applied: Applied) -> Option<u64> {
    match applied {
        Applied::TimerLogged { minutes, .. } => Some(minutes),
        _ => None,
    }
}

fn timer_response(timer: &FocusTimer, logged_minutes: Option<u64>) -> TimerResponse {
    let now_ms = Local::now().timestamp_millis();
    TimerResponse {
        status: timer.status(),
        elapsed_secs: timer.elapsed_secs(now_ms),
        remaining_secs: timer.remaining_secs(now_ms),
        target_minutes: timer.target_minutes(),
        start_epoch_millis: timer.start_epoch_ms(),
        logged_minutes,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
