//! Server row queries

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgExecutor, PgPool, Row};

use super::models::{NewServer, Server, ServerStatus, ServerView, pending_instance_id};
use crate::gateway::types::PageWindow;
use crate::provider::InstanceSnapshot;

const SERVER_COLUMNS: &str = "s.id, s.user_id, s.order_id, s.provider_id, s.product_id, s.name, \
                              s.instance_id, s.region, s.zone, s.public_ip, s.private_ip, \
                              s.status, s.expire_time, s.auto_renew, s.password_hash, \
                              s.image_id, s.os_type, s.os_name, s.cpu, s.memory, s.storage, \
                              s.bandwidth, s.traffic, s.used_traffic, s.created_at, s.updated_at";

const VIEW_JOIN: &str = "FROM servers s \
                         JOIN providers v ON v.id = s.provider_id \
                         JOIN products p ON p.id = s.product_id";

fn map_server(r: &PgRow) -> Result<Server, sqlx::Error> {
    Ok(Server {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        order_id: r.try_get("order_id")?,
        provider_id: r.try_get("provider_id")?,
        product_id: r.try_get("product_id")?,
        name: r.try_get("name")?,
        instance_id: r.try_get("instance_id")?,
        region: r.try_get("region")?,
        zone: r.try_get("zone")?,
        public_ip: r.try_get("public_ip")?,
        private_ip: r.try_get("private_ip")?,
        status: ServerStatus::parse(r.try_get::<&str, _>("status")?),
        expire_time: r.try_get("expire_time")?,
        auto_renew: r.try_get("auto_renew")?,
        password_hash: r.try_get("password_hash")?,
        image_id: r.try_get("image_id")?,
        os_type: r.try_get("os_type")?,
        os_name: r.try_get("os_name")?,
        cpu: r.try_get("cpu")?,
        memory: r.try_get("memory")?,
        storage: r.try_get("storage")?,
        bandwidth: r.try_get("bandwidth")?,
        traffic: r.try_get("traffic")?,
        used_traffic: r.try_get("used_traffic")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn map_server_view(r: &PgRow) -> Result<ServerView, sqlx::Error> {
    Ok(ServerView {
        server: map_server(r)?,
        provider_name: r.try_get("provider_name")?,
        provider_code: r.try_get("provider_code")?,
        product_name: r.try_get("product_name")?,
    })
}

pub struct ServerRepository;

impl ServerRepository {
    /// Insert a `creating` row with a placeholder instance id
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewServer<'_>,
    ) -> Result<Server, sqlx::Error> {
        let sql = format!(
            "INSERT INTO servers AS s (user_id, order_id, provider_id, product_id, name, instance_id, \
             region, zone, status, expire_time, auto_renew, password_hash, image_id, os_name, \
             cpu, memory, storage, bandwidth, traffic) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING {}",
            SERVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(new.user_id)
            .bind(new.order_id)
            .bind(new.provider_id)
            .bind(new.product_id)
            .bind(&new.name)
            .bind(pending_instance_id())
            .bind(new.region)
            .bind(new.zone)
            .bind(ServerStatus::Creating.as_str())
            .bind(new.expire_time)
            .bind(new.auto_renew)
            .bind(new.password_hash)
            .bind(new.image_id)
            .bind(new.os_name)
            .bind(new.cpu)
            .bind(new.memory)
            .bind(new.storage)
            .bind(new.bandwidth)
            .bind(new.traffic)
            .fetch_one(conn)
            .await?;
        map_server(&row)
    }

    /// Server owned by `user_id`; someone else's server reads as missing
    pub async fn get_owned(
        pool: &PgPool,
        server_id: i64,
        user_id: i64,
    ) -> Result<Option<ServerView>, sqlx::Error> {
        let sql = format!(
            "SELECT {}, v.name AS provider_name, v.code AS provider_code, p.name AS product_name \
             {} WHERE s.id = $1 AND s.user_id = $2",
            SERVER_COLUMNS, VIEW_JOIN
        );
        let row = sqlx::query(&sql)
            .bind(server_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        row.as_ref().map(map_server_view).transpose()
    }

    /// Owned server with its row locked until the transaction ends.
    /// Lifecycle commands on one server queue up behind this lock.
    pub async fn lock_owned(
        conn: &mut PgConnection,
        server_id: i64,
        user_id: i64,
    ) -> Result<Option<ServerView>, sqlx::Error> {
        let sql = format!(
            "SELECT {}, v.name AS provider_name, v.code AS provider_code, p.name AS product_name \
             {} WHERE s.id = $1 AND s.user_id = $2 FOR UPDATE OF s",
            SERVER_COLUMNS, VIEW_JOIN
        );
        let row = sqlx::query(&sql)
            .bind(server_id)
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
        row.as_ref().map(map_server_view).transpose()
    }

    /// Newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: i64,
        window: PageWindow,
    ) -> Result<(Vec<ServerView>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM servers WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        let sql = format!(
            "SELECT {}, v.name AS provider_name, v.code AS provider_code, p.name AS product_name \
             {} WHERE s.user_id = $1 ORDER BY s.created_at DESC, s.id DESC LIMIT $2 OFFSET $3",
            SERVER_COLUMNS, VIEW_JOIN
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(window.limit())
            .bind(window.offset())
            .fetch_all(pool)
            .await?;
        let items = rows
            .iter()
            .map(map_server_view)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    pub async fn list_by_order(pool: &PgPool, order_id: i64) -> Result<Vec<Server>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM servers s WHERE s.order_id = $1 ORDER BY s.id",
            SERVER_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(order_id).fetch_all(pool).await?;
        rows.iter().map(map_server).collect()
    }

    pub async fn set_status<'e, E: PgExecutor<'e>>(
        exec: E,
        server_id: i64,
        status: ServerStatus,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE servers SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(server_id)
                .bind(status.as_str())
                .execute(exec)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Copy vendor-reported fields onto the row. `status = None` keeps the
    /// current status. The local expiry (paid period) is never overwritten.
    pub async fn apply_snapshot<'e, E: PgExecutor<'e>>(
        exec: E,
        server_id: i64,
        snap: &InstanceSnapshot,
        status: Option<ServerStatus>,
    ) -> Result<Option<Server>, sqlx::Error> {
        let sql = format!(
            "UPDATE servers s SET instance_id = $2, public_ip = $3, private_ip = $4, \
             status = COALESCE($5, s.status), os_type = $6, os_name = $7, image_id = $8, \
             cpu = $9, memory = $10, storage = $11, bandwidth = $12, traffic = $13, \
             used_traffic = $14, zone = CASE WHEN $15 = '' THEN s.zone ELSE $15 END, \
             updated_at = NOW() \
             WHERE s.id = $1 RETURNING {}",
            SERVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(server_id)
            .bind(&snap.instance_id)
            .bind(&snap.public_ip)
            .bind(&snap.private_ip)
            .bind(status.map(|s| s.as_str()))
            .bind(&snap.os_type)
            .bind(&snap.os_name)
            .bind(&snap.image_id)
            .bind(snap.cpu)
            .bind(snap.memory)
            .bind(snap.storage)
            .bind(snap.bandwidth)
            .bind(snap.traffic)
            .bind(snap.used_traffic)
            .bind(&snap.zone)
            .fetch_optional(exec)
            .await?;
        row.as_ref().map(map_server).transpose()
    }

    /// Record the vendor instance id right after creation
    pub async fn set_instance_id(
        pool: &PgPool,
        server_id: i64,
        instance_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE servers SET instance_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(server_id)
                .bind(instance_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}
