use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::db;
use crate::dto::pick_dto::{CreatePick, Pick, UpdatePick};
use crate::error::{is_unique_violation_on, AppError};
use crate::services::audit_log;

const MAX_RESULT_LEN: usize = 10;

/// Creates the pick for (entry, week), or overwrites the team of the one
/// already there. A team may appear only once per entry across all weeks.
pub async fn submit(pool: &SqlitePool, user_id: &str, payload: CreatePick) -> Result<Pick, AppError> {
    validate_week(payload.week)?;
    let team = validate_team(&payload.team)?;

    let mut tx = db::begin_write(pool).await?;
    require_owned_entry(&mut tx, &payload.entry_id, user_id).await?;

    let existing = find_for_week(&mut tx, &payload.entry_id, payload.week).await?;
    if existing.as_ref().is_some_and(|pick| pick.locked) {
        return Err(AppError::PickLocked { action: "update" });
    }

    let keep_id = existing.as_ref().map(|pick| pick.id.as_str());
    ensure_team_unused(&mut tx, &payload.entry_id, &team, keep_id).await?;

    let now = Utc::now();
    // The upsert keeps (entry, week) single-row even if two submissions race.
    let pick = sqlx::query_as::<_, Pick>(
        r#"
        INSERT INTO picks (id, entry_id, week, team, locked, result, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, NULL, ?, ?)
        ON CONFLICT(entry_id, week) DO UPDATE SET
            team = excluded.team,
            updated_at = excluded.updated_at
        WHERE picks.locked = 0
        RETURNING id, entry_id, week, team, locked, result, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&payload.entry_id)
    .bind(payload.week)
    .bind(&team)
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| translate_conflict(e, &team, payload.week))?
    .ok_or(AppError::PickLocked { action: "update" })?;

    let action = if existing.is_some() { "pick.overwrite" } else { "pick.create" };
    audit_log::record(
        &mut tx,
        user_id,
        action,
        format!("entry={} week={} team={} pick={}", pick.entry_id, pick.week, pick.team, pick.id),
    )
    .await?;

    tx.commit().await?;
    Ok(pick)
}

/// Partial update of an unlocked pick owned by `user_id`.
pub async fn update(
    pool: &SqlitePool,
    user_id: &str,
    pick_id: &str,
    mut changes: UpdatePick,
) -> Result<Pick, AppError> {
    if let Some(week) = changes.week {
        validate_week(week)?;
    }
    if let Some(team) = changes.team.take() {
        changes.team = Some(validate_team(&team)?);
    }
    if let Some(Some(result)) = &changes.result {
        validate_result(result)?;
    }

    let mut tx = db::begin_write(pool).await?;
    let mut pick = find_owned_pick(&mut tx, pick_id, user_id).await?;

    if pick.locked {
        return Err(AppError::PickLocked { action: "update" });
    }

    if let Some(team) = changes.team.as_deref().filter(|team| *team != pick.team) {
        ensure_team_unused(&mut tx, &pick.entry_id, team, Some(pick.id.as_str())).await?;
    }
    if let Some(week) = changes.week.filter(|week| *week != pick.week) {
        ensure_week_free(&mut tx, &pick.entry_id, week).await?;
    }

    changes.apply_to(&mut pick);
    pick.updated_at = Utc::now();

    let res = sqlx::query(
        r#"
        UPDATE picks
        SET week = ?, team = ?, locked = ?, result = ?, updated_at = ?
        WHERE id = ? AND locked = 0
        "#,
    )
    .bind(pick.week)
    .bind(&pick.team)
    .bind(pick.locked)
    .bind(&pick.result)
    .bind(pick.updated_at)
    .bind(&pick.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| translate_conflict(e, &pick.team, pick.week))?;

    if res.rows_affected() == 0 {
        return Err(AppError::PickLocked { action: "update" });
    }

    audit_log::record(
        &mut tx,
        user_id,
        "pick.update",
        format!(
            "entry={} week={} team={} locked={} pick={}",
            pick.entry_id, pick.week, pick.team, pick.locked, pick.id
        ),
    )
    .await?;

    tx.commit().await?;
    Ok(pick)
}

pub async fn delete(pool: &SqlitePool, user_id: &str, pick_id: &str) -> Result<(), AppError> {
    let mut tx = db::begin_write(pool).await?;
    let pick = find_owned_pick(&mut tx, pick_id, user_id).await?;

    if pick.locked {
        return Err(AppError::PickLocked { action: "delete" });
    }

    let res = sqlx::query("DELETE FROM picks WHERE id = ? AND locked = 0")
        .bind(&pick.id)
        .execute(&mut *tx)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::PickLocked { action: "delete" });
    }

    audit_log::record(
        &mut tx,
        user_id,
        "pick.delete",
        format!("entry={} week={} team={} pick={}", pick.entry_id, pick.week, pick.team, pick.id),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// All picks of an owned entry, ascending by week.
pub async fn list(pool: &SqlitePool, user_id: &str, entry_id: &str) -> Result<Vec<Pick>, AppError> {
    let mut conn = pool.acquire().await?;
    require_owned_entry(&mut conn, entry_id, user_id).await?;

    let picks = sqlx::query_as::<_, Pick>(
        r#"
        SELECT id, entry_id, week, team, locked, result, created_at, updated_at
        FROM picks
        WHERE entry_id = ?
        ORDER BY week ASC
        "#,
    )
    .bind(entry_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(picks)
}

/// Entries a cascading delete is about to take with it.
pub enum EntryScope<'a> {
    Entry(&'a str),
    Pool(&'a str),
    /// The user's own entries plus every entry in pools the user owns.
    User(&'a str),
}

/// Refuses a delete whose cascade would remove a locked pick. Run it inside the
/// write transaction that performs the delete.
pub async fn ensure_no_locked_picks(
    conn: &mut SqliteConnection,
    scope: EntryScope<'_>,
) -> Result<(), AppError> {
    let (filter, id) = match scope {
        EntryScope::Entry(id) => ("e.id = ?1", id),
        EntryScope::Pool(id) => ("e.pool_id = ?1", id),
        EntryScope::User(id) => (
            "e.user_id = ?1 OR e.pool_id IN (SELECT id FROM pools WHERE owner_id = ?1)",
            id,
        ),
    };
    let sql = format!(
        "SELECT COUNT(*) FROM picks p JOIN entries e ON e.id = p.entry_id WHERE p.locked = 1 AND ({filter})"
    );

    let locked: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *conn).await?;
    if locked > 0 {
        warn!("Refused delete that would remove {} locked pick(s)", locked);
        return Err(AppError::PickLocked { action: "delete" });
    }
    Ok(())
}

async fn require_owned_entry(
    conn: &mut SqliteConnection,
    entry_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    found.map(|_| ()).ok_or(AppError::NotFoundOrForbidden("Entry"))
}

async fn find_owned_pick(
    conn: &mut SqliteConnection,
    pick_id: &str,
    user_id: &str,
) -> Result<Pick, AppError> {
    sqlx::query_as::<_, Pick>(
        r#"
        SELECT p.id, p.entry_id, p.week, p.team, p.locked, p.result, p.created_at, p.updated_at
        FROM picks p
        JOIN entries e ON e.id = p.entry_id
        WHERE p.id = ? AND e.user_id = ?
        "#,
    )
    .bind(pick_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFoundOrForbidden("Pick"))
}

async fn find_for_week(
    conn: &mut SqliteConnection,
    entry_id: &str,
    week: i64,
) -> Result<Option<Pick>, AppError> {
    let pick = sqlx::query_as::<_, Pick>(
        r#"
        SELECT id, entry_id, week, team, locked, result, created_at, updated_at
        FROM picks
        WHERE entry_id = ? AND week = ?
        "#,
    )
    .bind(entry_id)
    .bind(week)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(pick)
}

/// `except` excludes the pick being rewritten from the search.
async fn ensure_team_unused(
    conn: &mut SqliteConnection,
    entry_id: &str,
    team: &str,
    except: Option<&str>,
) -> Result<(), AppError> {
    let used: Option<String> = sqlx::query_scalar(
        "SELECT id FROM picks WHERE entry_id = ? AND team = ? AND id IS NOT ? LIMIT 1",
    )
    .bind(entry_id)
    .bind(team)
    .bind(except)
    .fetch_optional(&mut *conn)
    .await?;

    match used {
        Some(_) => {
            warn!("Rejected duplicate team {} for entry {}", team, entry_id);
            Err(AppError::DuplicateTeamSelection { team: team.to_string() })
        }
        None => Ok(()),
    }
}

async fn ensure_week_free(conn: &mut SqliteConnection, entry_id: &str, week: i64) -> Result<(), AppError> {
    match find_for_week(conn, entry_id, week).await? {
        Some(_) => Err(AppError::WeekAlreadyPicked { week }),
        None => Ok(()),
    }
}

fn translate_conflict(err: sqlx::Error, team: &str, week: i64) -> AppError {
    if is_unique_violation_on(&err, "picks.team") {
        AppError::DuplicateTeamSelection { team: team.to_string() }
    } else if is_unique_violation_on(&err, "picks.week") {
        AppError::WeekAlreadyPicked { week }
    } else {
        AppError::Database(err)
    }
}

fn validate_week(week: i64) -> Result<(), AppError> {
    if week < 1 {
        return Err(AppError::Validation(format!("Week must be a positive integer, got {week}")));
    }
    Ok(())
}

fn validate_team(team: &str) -> Result<String, AppError> {
    let team = team.trim();
    if team.is_empty() {
        return Err(AppError::Validation("Team must not be empty".to_string()));
    }
    Ok(team.to_string())
}

fn validate_result(result: &str) -> Result<(), AppError> {
    if result.chars().count() > MAX_RESULT_LEN {
        return Err(AppError::Validation(format!(
            "Result must be at most {MAX_RESULT_LEN} characters"
        )));
    }
    Ok(())
}
