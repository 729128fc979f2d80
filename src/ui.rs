use crate::grid::{GridWindow, generate_grid};
use crate::intensity::{Tier, classify, classify_cell};
use crate::models::{ActiveView, AppData, Habit};
use crate::timer::{FocusTimer, TimerStatus};
use chrono::{DateTime, Local};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn render_index(
    data: &AppData,
    selected: Option<&str>,
    window: GridWindow,
    now: DateTime<Local>,
) -> String {
    let today = now.date_naive();
    let body = if data.habits.is_empty() {
        EMPTY_STATE.to_string()
    } else {
        let shown: Vec<&Habit> = match data.active_view {
            ActiveView::Dashboard => data.habits.iter().collect(),
            ActiveView::Single => selected
                .and_then(|id| data.habit(id))
                .or_else(|| data.active_habit())
                .into_iter()
                .collect(),
        };
        let mut cards = String::new();
        for habit in shown {
            cards.push_str(&render_habit(habit, data, window, now));
        }
        cards
    };

    INDEX_HTML
        .replace("{{THEME}}", &escape(data.theme.as_deref().unwrap_or("dark")))
        .replace("{{TODAY}}", &today.to_string())
        .replace("{{WINDOWS}}", &render_window_tabs(window))
        .replace("{{HABITS}}", &body)
}

fn render_habit(habit: &Habit, data: &AppData, window: GridWindow, now: DateTime<Local>) -> String {
    let today = now.date_naive();
    let grid = generate_grid(&habit.log, window, today);
    let id = escape(&habit.id);
    let unit = escape(&habit.unit);

    let mut labels = String::new();
    for label in &grid.month_labels {
        let left = label.week_index as f64 / grid.total_weeks.max(1) as f64 * 100.0;
        labels.push_str(&format!(
            r#"<span class="month" style="left:{left:.2}%">{}</span>"#,
            label.label
        ));
    }

    let mut cells = String::new();
    for cell in &grid.cells {
        let intensity = classify_cell(cell.value, cell.is_future, &habit.levels);
        cells.push_str(&format!(
            r#"<div class="cell {}{}" style="grid-row:{};grid-column:{}" title="{}: {} {}"></div>"#,
            intensity.tier.css_class(),
            if cell.in_window { "" } else { " outside" },
            cell.day_of_week + 1,
            cell.week_index + 1,
            cell.display_date,
            cell.value,
            unit,
        ));
    }

    let legend: String = [0, habit.levels.low, habit.levels.medium, habit.levels.high]
        .iter()
        .map(|value| {
            let tier = if *value == 0 { Tier::Empty } else { classify(*value, &habit.levels).tier };
            format!(
                r#"<span class="cell {}" title="{value} {unit}"></span>"#,
                tier.css_class()
            )
        })
        .collect();

    let timer = if habit.use_timer && data.active_habit_id.as_deref() == Some(habit.id.as_str()) {
        render_timer(&data.timer, now)
    } else {
        String::new()
    };

    let weekdays: String = WEEKDAYS
        .iter()
        .map(|day| format!("<span>{day}</span>"))
        .collect();

    format!(
        r#"<article class="habit">
  <header class="habit-header">
    <h2>{name}</h2>
    <span class="subtitle">{total} {unit} logged</span>
  </header>
  {timer}
  <div class="grid-wrap">
    <div class="weekdays">{weekdays}</div>
    <div class="grid-body">
      <div class="months">{labels}</div>
      <div class="grid" style="grid-template-columns:repeat({weeks},1fr)">{cells}</div>
    </div>
  </div>
  <div class="legend"><span>Less</span>{legend}<span>More</span></div>
  <form class="log-form" method="post" action="/habits/{id}/log">
    <input type="date" name="date" value="{today}" max="{today}" required />
    <input type="number" name="value" min="1" value="{low}" required />
    <button type="submit">Log {unit}</button>
  </form>
  <form method="post" action="/habits/{id}/delete">
    <button class="danger" type="submit">Delete habit</button>
  </form>
</article>"#,
        name = escape(&habit.name),
        total = crate::aggregate::total(&habit.log),
        weeks = grid.total_weeks,
        low = habit.levels.low.max(1),
    )
}

fn render_timer(timer: &FocusTimer, now: DateTime<Local>) -> String {
    let elapsed = timer.elapsed_secs(now.timestamp_millis());
    let running = timer.status() == TimerStatus::Running;
    let mut buttons = String::new();
    let toggle = if running { "pause" } else { "start" };
    buttons.push_str(&format!(
        r#"<button formaction="/timer/{toggle}" type="submit">{}</button>"#,
        if running { "Pause" } else { "Start" }
    ));
    if !running && elapsed > 0 {
        buttons.push_str(r#"<button formaction="/timer/log" type="submit">Log current</button>"#);
    }
    buttons.push_str(r#"<button formaction="/timer/reset" type="submit">Reset</button>"#);

    format!(
        r#"<form class="timer" method="post">
    <span class="clock">{}:{:02}</span>
    <span class="subtitle">target {} min</span>
    {buttons}
  </form>"#,
        elapsed / 60,
        elapsed % 60,
        timer.target_minutes(),
    )
}

fn render_window_tabs(current: GridWindow) -> String {
    GridWindow::ALL
        .iter()
        .map(|window| {
            format!(
                r#"<a class="tab{}" href="/?window={}">{}</a>"#,
                if *window == current { " active" } else { "" },
                window.as_str(),
                window.as_str().replace('-', " "),
            )
        })
        .collect()
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const EMPTY_STATE: &str = r#"<section class="empty">
  <h2>Welcome to Habit Tracker</h2>
  <p class="subtitle">Start tracking your habits by creating your first one.</p>
</section>"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker</title>
  <style>
    :root {
      --bg: #111827;
      --card: #1f2937;
      --ink: #f3f4f6;
      --muted: #9ca3af;
      --accent: #16a34a;
      --danger: #b91c1c;
    }

    body.light {
      --bg: #f8f3e6;
      --card: #ffffff;
      --ink: #2b2a28;
      --muted: #6b645d;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    .subtitle {
      color: var(--muted);
      font-size: 0.9rem;
    }

    .tabs {
      display: flex;
      gap: 6px;
    }

    .tab {
      color: var(--muted);
      text-decoration: none;
      padding: 6px 12px;
      border-radius: 999px;
    }

    .tab.active {
      background: var(--card);
      color: var(--ink);
    }

    .habit, .empty, .new-habit {
      background: var(--card);
      border-radius: 16px;
      padding: 20px;
      display: grid;
      gap: 14px;
    }

    .habit-header {
      display: flex;
      justify-content: space-between;
      align-items: baseline;
    }

    .habit-header h2 {
      margin: 0;
    }

    .grid-wrap {
      display: flex;
      gap: 8px;
    }

    .weekdays {
      display: grid;
      grid-template-rows: repeat(7, 12px);
      gap: 2px;
      margin-top: 20px;
      font-size: 10px;
      color: var(--muted);
    }

    .grid-body {
      flex: 1;
    }

    .months {
      position: relative;
      height: 20px;
      font-size: 10px;
      color: var(--muted);
    }

    .month {
      position: absolute;
      transform: translateX(-50%);
    }

    .grid {
      display: grid;
      grid-template-rows: repeat(7, 12px);
      grid-auto-flow: column;
      gap: 2px;
    }

    .cell {
      display: inline-block;
      min-width: 10px;
      height: 12px;
      border-radius: 2px;
    }

    .cell.outside {
      opacity: 0.35;
    }

    .bg-empty { background: #374151; }
    .bg-green-900 { background: #14532d; }
    .bg-green-700 { background: #15803d; }
    .bg-green-500 { background: #22c55e; }
    .bg-green-300 { background: #86efac; }

    .legend {
      display: flex;
      align-items: center;
      gap: 4px;
      font-size: 0.8rem;
      color: var(--muted);
    }

    .legend .cell {
      width: 12px;
    }

    form {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      align-items: center;
    }

    input {
      background: var(--bg);
      color: var(--ink);
      border: 1px solid var(--muted);
      border-radius: 8px;
      padding: 8px;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 8px 16px;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    button.danger {
      background: var(--danger);
    }

    .clock {
      font-size: 2rem;
      font-variant-numeric: tabular-nums;
    }
  </style>
</head>
<body class="{{THEME}}">
  <main class="app">
    <header>
      <h1>Habit Tracker</h1>
      <p class="subtitle">Today is {{TODAY}}.</p>
      <nav class="tabs">{{WINDOWS}}</nav>
    </header>
    {{HABITS}}
    <section class="new-habit">
      <h2>Add habit</h2>
      <form method="post" action="/habits">
        <input type="text" name="name" placeholder="Name" required />
        <input type="text" name="unit" placeholder="e.g., minutes, pages, steps" required />
        <label><input type="checkbox" name="use_timer" /> Enable timer</label>
        <input type="number" name="low" value="30" min="1" required />
        <input type="number" name="medium" value="60" min="1" required />
        <input type="number" name="high" value="120" min="1" required />
        <button type="submit">Add Habit</button>
      </form>
    </section>
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Levels;
    use chrono::{NaiveDate, TimeZone};

    fn habit(id: &str, name: &str) -> Habit {
        Habit {
            id: id.into(),
            name: name.into(),
            unit: "minutes".into(),
            use_timer: true,
            levels: Levels::default(),
            log: [(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), 45)].into(),
        }
    }

    #[test]
    fn empty_store_renders_welcome() {
        let now = Local.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let html = render_index(&AppData::default(), None, GridWindow::FirstHalf, now);
        assert!(html.contains("Welcome to Habit Tracker"));
        assert!(html.contains("Today is 2024-03-20."));
    }

    #[test]
    fn single_view_renders_selected_habit_escaped() {
        let now = Local.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let data = AppData {
            habits: vec![habit("a", "Focus"), habit("b", "<Reading>")],
            active_habit_id: Some("a".into()),
            ..AppData::default()
        };
        let html = render_index(&data, Some("b"), GridWindow::FirstHalf, now);
        assert!(html.contains("&lt;Reading&gt;"));
        assert!(!html.contains("<h2>Focus</h2>"));
        // 27 weeks for the first half of 2024.
        assert_eq!(html.matches(r#"<div class="cell "#).count(), 27 * 7);
        assert!(html.contains("bg-green-700"), "45 minutes is a medium day");
    }

    #[test]
    fn timer_shows_for_active_timer_habit() {
        let now = Local.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let data = AppData {
            habits: vec![habit("a", "Focus")],
            active_habit_id: Some("a".into()),
            active_view: ActiveView::Dashboard,
            ..AppData::default()
        };
        let html = render_index(&data, None, GridWindow::FullYear, now);
        assert!(html.contains(r#"formaction="/timer/start""#));
        assert!(html.contains("target 25 min"));
    }
}
