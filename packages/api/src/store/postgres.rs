//! PostgreSQL booking store
//!
//! A commit runs in one transaction. Updates are issued as
//! `UPDATE .. WHERE id = ? AND version = ?`; zero affected rows means another
//! writer got there first and the whole transaction is rolled back.

use adslot::model::{
    Channel, ChannelAnalytics, Client, Competition, FormatPrices, Manager, ManagerPayout, Order,
    Slot,
};
use adslot::store::{BookingStore, StoreError, StoreResult, Write};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};

use crate::entity::sea_orm_active_enums::{OrderStatus, SlotStatus};
use crate::entity::{channel, client, competition, manager, manager_payout, order, slot};

#[derive(Debug)]
pub struct PostgresBookingStore {
    db: DatabaseConnection,
}

impl PostgresBookingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn db_err(err: DbErr) -> StoreError {
    StoreError::Database(err.to_string())
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}

fn narrow<T: TryFrom<i64>>(field: &str, value: i64) -> StoreResult<T> {
    T::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("{} out of range: {}", field, value)))
}

// ============================================================================
// Row conversion
// ============================================================================

fn channel_row(channel: &Channel, version: i64, now: NaiveDateTime) -> channel::Model {
    let analytics = &channel.analytics;
    channel::Model {
        id: channel.id.clone(),
        external_id: channel.external_id.clone(),
        title: channel.title.clone(),
        username: channel.username.clone(),
        category: channel.category.clone(),
        price_top1_feed24: channel.prices.top1_feed24,
        price_top1_feed48: channel.prices.top1_feed48,
        price_top2_feed48: channel.prices.top2_feed48,
        price_native: channel.prices.native,
        subscribers: analytics.subscribers,
        reach_24h: analytics.reach_24h,
        reach_48h: analytics.reach_48h,
        reach_72h: analytics.reach_72h,
        err_percent: analytics.err_percent,
        err24_percent: analytics.err24_percent,
        cpm: analytics.cpm,
        analytics_refreshed_at: analytics.refreshed_at.map(|t| t.naive_utc()),
        is_active: channel.is_active,
        version,
        created_at: channel.created_at.naive_utc(),
        updated_at: now,
    }
}

fn channel_from_row(row: channel::Model) -> Channel {
    Channel {
        id: row.id,
        external_id: row.external_id,
        title: row.title,
        username: row.username,
        category: row.category,
        prices: FormatPrices {
            top1_feed24: row.price_top1_feed24,
            top1_feed48: row.price_top1_feed48,
            top2_feed48: row.price_top2_feed48,
            native: row.price_native,
        },
        analytics: ChannelAnalytics {
            subscribers: row.subscribers,
            reach_24h: row.reach_24h,
            reach_48h: row.reach_48h,
            reach_72h: row.reach_72h,
            err_percent: row.err_percent,
            err24_percent: row.err24_percent,
            cpm: row.cpm,
            refreshed_at: row.analytics_refreshed_at.map(utc),
        },
        is_active: row.is_active,
        version: row.version,
        created_at: utc(row.created_at),
    }
}

fn slot_row(slot: &Slot, version: i64, now: NaiveDateTime) -> slot::Model {
    slot::Model {
        id: slot.id.clone(),
        channel_id: slot.channel_id.clone(),
        date: slot.date,
        time: slot.time,
        status: slot.status.into(),
        holder_id: slot.holder_id.clone(),
        reserved_until: slot.reserved_until.map(|t| t.naive_utc()),
        version,
        created_at: slot.created_at.naive_utc(),
        updated_at: now,
    }
}

fn slot_from_row(row: slot::Model) -> Slot {
    Slot {
        id: row.id,
        channel_id: row.channel_id,
        date: row.date,
        time: row.time,
        status: row.status.into(),
        holder_id: row.holder_id,
        reserved_until: row.reserved_until.map(utc),
        version: row.version,
        created_at: utc(row.created_at),
    }
}

fn client_row(client: &Client, version: i64, now: NaiveDateTime) -> client::Model {
    client::Model {
        id: client.id.clone(),
        telegram_id: client.telegram_id,
        name: client.name.clone(),
        total_orders: client.total_orders,
        total_spent: client.total_spent,
        version,
        created_at: client.created_at.naive_utc(),
        updated_at: now,
    }
}

fn client_from_row(row: client::Model) -> Client {
    Client {
        id: row.id,
        telegram_id: row.telegram_id,
        name: row.name,
        total_orders: row.total_orders,
        total_spent: row.total_spent,
        version: row.version,
        created_at: utc(row.created_at),
    }
}

fn manager_row(manager: &Manager, version: i64, now: NaiveDateTime) -> manager::Model {
    manager::Model {
        id: manager.id.clone(),
        telegram_id: manager.telegram_id,
        name: manager.name.clone(),
        status: manager.status.into(),
        level: i16::from(manager.level),
        experience_points: manager.experience_points,
        commission_rate: manager.commission_rate as i32,
        balance: manager.balance,
        total_earned: manager.total_earned,
        total_sales: manager.total_sales,
        total_revenue: manager.total_revenue,
        version,
        created_at: manager.created_at.naive_utc(),
        updated_at: now,
    }
}

fn manager_from_row(row: manager::Model) -> StoreResult<Manager> {
    Ok(Manager {
        level: narrow("manager level", i64::from(row.level))?,
        commission_rate: narrow("commission rate", i64::from(row.commission_rate))?,
        id: row.id,
        telegram_id: row.telegram_id,
        name: row.name,
        status: row.status.into(),
        experience_points: row.experience_points,
        balance: row.balance,
        total_earned: row.total_earned,
        total_sales: row.total_sales,
        total_revenue: row.total_revenue,
        version: row.version,
        created_at: utc(row.created_at),
    })
}

fn order_row(order: &Order, version: i64, now: NaiveDateTime) -> order::Model {
    order::Model {
        id: order.id.clone(),
        slot_id: order.slot_id.clone(),
        client_id: order.client_id.clone(),
        manager_id: order.manager_id.clone(),
        format: order.format.into(),
        base_price: order.base_price,
        discount_percent: i16::from(order.discount_percent),
        final_price: order.final_price,
        status: order.status.into(),
        paid_at: order.paid_at.map(|t| t.naive_utc()),
        posted_at: order.posted_at.map(|t| t.naive_utc()),
        completed_at: order.completed_at.map(|t| t.naive_utc()),
        cancelled_at: order.cancelled_at.map(|t| t.naive_utc()),
        version,
        created_at: order.created_at.naive_utc(),
        updated_at: now,
    }
}

fn order_from_row(row: order::Model) -> StoreResult<Order> {
    Ok(Order {
        discount_percent: narrow("discount", i64::from(row.discount_percent))?,
        id: row.id,
        slot_id: row.slot_id,
        client_id: row.client_id,
        manager_id: row.manager_id,
        format: row.format.into(),
        base_price: row.base_price,
        final_price: row.final_price,
        status: row.status.into(),
        paid_at: row.paid_at.map(utc),
        posted_at: row.posted_at.map(utc),
        completed_at: row.completed_at.map(utc),
        cancelled_at: row.cancelled_at.map(utc),
        version: row.version,
        created_at: utc(row.created_at),
    })
}

fn payout_row(payout: &ManagerPayout, version: i64) -> manager_payout::Model {
    manager_payout::Model {
        id: payout.id.clone(),
        manager_id: payout.manager_id.clone(),
        amount: payout.amount,
        status: payout.status.into(),
        requested_at: payout.requested_at.naive_utc(),
        processed_at: payout.processed_at.map(|t| t.naive_utc()),
        version,
    }
}

fn payout_from_row(row: manager_payout::Model) -> ManagerPayout {
    ManagerPayout {
        id: row.id,
        manager_id: row.manager_id,
        amount: row.amount,
        status: row.status.into(),
        requested_at: utc(row.requested_at),
        processed_at: row.processed_at.map(utc),
        version: row.version,
    }
}

fn competition_row(competition: &Competition, version: i64) -> competition::Model {
    competition::Model {
        id: competition.id.clone(),
        title: competition.title.clone(),
        start_date: competition.start_date,
        end_date: competition.end_date,
        metric: competition.metric.into(),
        status: competition.status.into(),
        version,
        created_at: competition.created_at.naive_utc(),
    }
}

fn competition_from_row(row: competition::Model) -> Competition {
    Competition {
        id: row.id,
        title: row.title,
        start_date: row.start_date,
        end_date: row.end_date,
        metric: row.metric.into(),
        status: row.status.into(),
        version: row.version,
        created_at: utc(row.created_at),
    }
}

// ============================================================================
// Conditional writes
// ============================================================================

async fn insert_row<C, A>(conn: &C, row: A, write: &Write) -> StoreResult<()>
where
    C: ConnectionTrait,
    A: ActiveModelTrait + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    match <A::Entity as EntityTrait>::insert(row)
        .exec_without_returning(conn)
        .await
    {
        Ok(_) => Ok(()),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Err(write.already_exists()),
            _ => Err(db_err(err)),
        },
    }
}

/// Writes `row` only if the stored version still equals `read_version`
async fn update_row<C, E, A>(
    conn: &C,
    row: A,
    id_column: E::Column,
    version_column: E::Column,
    read_version: i64,
    write: &Write,
) -> StoreResult<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
    A: ActiveModelTrait<Entity = E> + Send,
{
    let result = E::update_many()
        .set(row)
        .filter(id_column.eq(write.id()))
        .filter(version_column.eq(read_version))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        return Err(write.conflict());
    }
    Ok(())
}

async fn apply_write<C: ConnectionTrait>(
    conn: &C,
    write: &Write,
    now: NaiveDateTime,
) -> StoreResult<()> {
    match write {
        Write::InsertChannel(r) => {
            let row = channel_row(r, r.version, now).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdateChannel(r) => {
            let row = channel_row(r, r.version + 1, now).into_active_model().reset_all();
            update_row(conn, row, channel::Column::Id, channel::Column::Version, r.version, write)
                .await
        }
        Write::InsertSlot(r) => {
            let row = slot_row(r, r.version, now).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdateSlot(r) => {
            let row = slot_row(r, r.version + 1, now).into_active_model().reset_all();
            update_row(conn, row, slot::Column::Id, slot::Column::Version, r.version, write).await
        }
        Write::InsertClient(r) => {
            let row = client_row(r, r.version, now).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdateClient(r) => {
            let row = client_row(r, r.version + 1, now).into_active_model().reset_all();
            update_row(conn, row, client::Column::Id, client::Column::Version, r.version, write)
                .await
        }
        Write::InsertManager(r) => {
            let row = manager_row(r, r.version, now).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdateManager(r) => {
            let row = manager_row(r, r.version + 1, now).into_active_model().reset_all();
            update_row(conn, row, manager::Column::Id, manager::Column::Version, r.version, write)
                .await
        }
        Write::InsertOrder(r) => {
            let row = order_row(r, r.version, now).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdateOrder(r) => {
            let row = order_row(r, r.version + 1, now).into_active_model().reset_all();
            update_row(conn, row, order::Column::Id, order::Column::Version, r.version, write)
                .await
        }
        Write::InsertPayout(r) => {
            let row = payout_row(r, r.version).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdatePayout(r) => {
            let row = payout_row(r, r.version + 1).into_active_model().reset_all();
            update_row(
                conn,
                row,
                manager_payout::Column::Id,
                manager_payout::Column::Version,
                r.version,
                write,
            )
            .await
        }
        Write::InsertCompetition(r) => {
            let row = competition_row(r, r.version).into_active_model().reset_all();
            insert_row(conn, row, write).await
        }
        Write::UpdateCompetition(r) => {
            let row = competition_row(r, r.version + 1).into_active_model().reset_all();
            update_row(
                conn,
                row,
                competition::Column::Id,
                competition::Column::Version,
                r.version,
                write,
            )
            .await
        }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get_channel(&self, id: &str) -> StoreResult<Option<Channel>> {
        let row = channel::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(channel_from_row))
    }

    async fn get_slot(&self, id: &str) -> StoreResult<Option<Slot>> {
        let row = slot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(slot_from_row))
    }

    async fn list_slots_for_channel(
        &self,
        channel_id: &str,
        from: NaiveDate,
    ) -> StoreResult<Vec<Slot>> {
        let rows = slot::Entity::find()
            .filter(slot::Column::ChannelId.eq(channel_id))
            .filter(slot::Column::Date.gte(from))
            .order_by_asc(slot::Column::Date)
            .order_by_asc(slot::Column::Time)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(slot_from_row).collect())
    }

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>> {
        let row = client::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(client_from_row))
    }

    async fn get_manager(&self, id: &str) -> StoreResult<Option<Manager>> {
        let row = manager::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        row.map(manager_from_row).transpose()
    }

    async fn list_managers(&self) -> StoreResult<Vec<Manager>> {
        let rows = manager::Entity::find()
            .order_by_asc(manager::Column::CreatedAt)
            .order_by_asc(manager::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(manager_from_row).collect()
    }

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        let row = order::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        row.map(order_from_row).transpose()
    }

    async fn find_open_order_for_slot(&self, slot_id: &str) -> StoreResult<Option<Order>> {
        let row = order::Entity::find()
            .filter(order::Column::SlotId.eq(slot_id))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .order_by_desc(order::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        row.map(order_from_row).transpose()
    }

    async fn list_completed_orders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>> {
        let rows = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .filter(order::Column::CompletedAt.gte(from.naive_utc()))
            .filter(order::Column::CompletedAt.lt(to.naive_utc()))
            .order_by_asc(order::Column::CompletedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(order_from_row).collect()
    }

    async fn get_payout(&self, id: &str) -> StoreResult<Option<ManagerPayout>> {
        let row = manager_payout::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(payout_from_row))
    }

    async fn get_competition(&self, id: &str) -> StoreResult<Option<Competition>> {
        let row = competition::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(competition_from_row))
    }

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let now = Utc::now().naive_utc();
        let txn = self.db.begin().await.map_err(db_err)?;

        for write in &writes {
            // Dropping `txn` on error rolls the batch back.
            apply_write(&txn, write, now).await?;
        }

        txn.commit().await.map_err(db_err)?;
        tracing::debug!(writes = writes.len(), "Committed booking writes");
        Ok(())
    }

    async fn reclaim_expired_slots(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let now = now.naive_utc();
        let released = slot::ActiveModel {
            status: sea_orm::Set(SlotStatus::Available),
            holder_id: sea_orm::Set(None),
            reserved_until: sea_orm::Set(None),
            updated_at: sea_orm::Set(now),
            ..Default::default()
        };

        let result = slot::Entity::update_many()
            .set(released)
            .col_expr(
                slot::Column::Version,
                Expr::col(slot::Column::Version).add(1),
            )
            .filter(slot::Column::Status.eq(SlotStatus::Reserved))
            .filter(
                Condition::any()
                    .add(slot::Column::ReservedUntil.lt(now))
                    .add(slot::Column::ReservedUntil.is_null()),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn expire_past_slots(&self, before: NaiveDate) -> StoreResult<u64> {
        let expired = slot::ActiveModel {
            status: sea_orm::Set(SlotStatus::Expired),
            updated_at: sea_orm::Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        let result = slot::Entity::update_many()
            .set(expired)
            .col_expr(
                slot::Column::Version,
                Expr::col(slot::Column::Version).add(1),
            )
            .filter(slot::Column::Status.eq(SlotStatus::Available))
            .filter(slot::Column::Date.lt(before))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
