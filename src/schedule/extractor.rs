use crate::schedule::{ScheduleEntry, ScheduleLayout};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Reads every fixture row of the schedule table
///
/// # Table Location
///
/// The first `div` whose id starts with `layout.container_id_prefix` and
/// contains `layout.container_id_contains`, then the first `table` inside it.
/// Every `tr` of that table is read; rows without a numeric period cell (header
/// and spacer rows) are skipped.
///
/// # Arguments
///
/// * `content` - The listing page HTML
/// * `layout` - Container and cell naming
///
/// # Returns
///
/// The rows in document order, or an empty list when the table is missing.
pub fn parse_schedule(content: &str, layout: &ScheduleLayout) -> Vec<ScheduleEntry> {
    let document = Html::parse_document(content);

    let Some(table) = find_schedule_table(&document, layout) else {
        return Vec::new();
    };

    let (Some(rows), Some(period_cell), Some(result_cell), Some(anchor)) = (
        selector("tr"),
        selector(&stat_selector(&layout.period_stat)),
        selector(&stat_selector(&layout.result_stat)),
        selector("a[href]"),
    ) else {
        tracing::warn!(?layout, "Schedule layout produced an invalid selector");
        return Vec::new();
    };

    let base = Url::parse(&layout.link_base).ok();

    table
        .select(&rows)
        .filter_map(|row| {
            let period = cell_text(row, &period_cell)?.parse::<u32>().ok()?;
            let has_result = cell_text(row, &result_cell).is_some_and(|t| !t.is_empty());
            let detail_link = row
                .select(&anchor)
                .find(|a| a.text().collect::<String>().trim() == layout.link_text)
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| resolve_link(href, base.as_ref()));

            Some(ScheduleEntry {
                period,
                has_result,
                detail_link,
            })
        })
        .collect()
}

/// The highest period that has at least one result
///
/// Returns `None` when the table is missing or no fixture has been played.
pub fn latest_completed_period(content: &str, layout: &ScheduleLayout) -> Option<u32> {
    let latest = parse_schedule(content, layout)
        .into_iter()
        .filter(|entry| entry.has_result)
        .map(|entry| entry.period)
        .max();

    match latest {
        Some(period) => tracing::info!(period, "Latest completed matchweek detected"),
        None => tracing::warn!("No completed matchweek found in schedule"),
    }
    latest
}

/// Detail links of every fixture in `period`, in document order
pub fn links_for_period(content: &str, period: u32, layout: &ScheduleLayout) -> Vec<String> {
    let links: Vec<String> = parse_schedule(content, layout)
        .into_iter()
        .filter(|entry| entry.period == period)
        .filter_map(|entry| entry.detail_link)
        .collect();

    tracing::info!(period, count = links.len(), "Found match reports");
    links
}

fn find_schedule_table<'a>(document: &'a Html, layout: &ScheduleLayout) -> Option<ElementRef<'a>> {
    let divs = selector("div[id]")?;
    let tables = selector("table")?;

    let container = document.select(&divs).find(|div| {
        div.value().id().is_some_and(|id| {
            id.starts_with(&layout.container_id_prefix)
                && id.contains(&layout.container_id_contains)
        })
    });

    let Some(container) = container else {
        tracing::warn!(
            prefix = %layout.container_id_prefix,
            contains = %layout.container_id_contains,
            "Could not find schedule container"
        );
        return None;
    };

    let table = container.select(&tables).next();
    if table.is_none() {
        tracing::warn!("Could not find schedule table inside the container");
    }
    table
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn stat_selector(stat: &str) -> String {
    format!("td[data-stat=\"{}\"]", stat.replace('"', "\\\""))
}

/// Trimmed text of the first cell matching `cell` in `row`
fn cell_text(row: ElementRef<'_>, cell: &Selector) -> Option<String> {
    row.select(cell)
        .next()
        .map(|c| c.text().collect::<String>().trim().to_string())
}

fn resolve_link(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    resolved.ok().map(|u| u.to_string())
}
