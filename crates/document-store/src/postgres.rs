use async_trait::async_trait;
use common::{Document, DocumentId, Line, LineId, ProductId};
use rust_decimal::Decimal;
use sqlx::{
    PgConnection, PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    DocumentQuery, Result, ScopeKey, StoreError,
    query::{Sort, SortKey, SortOrder},
    sequence::SequenceStore,
    store::{DocumentStore, OrderGraph},
};

const DOCUMENT_COLUMNS: &str = "id, kind, family, reference, entity, sequential_id, status, \
     parent_order, delivery_date, created_at, updated_at, is_removed, body, version";

const LINE_COLUMNS: &str = "id, order_id, product_id, quantity, unit_cost, sequence, is_deleted, \
     ref_supplier_product, description";

/// PostgreSQL-backed document store implementation.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        let body: serde_json::Value = row.try_get("body")?;
        Ok(serde_json::from_value(body)?)
    }

    fn row_to_line(row: PgRow) -> Result<Line> {
        Ok(Line {
            id: LineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: DocumentId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: row
                .try_get::<Option<Uuid>, _>("product_id")?
                .map(ProductId::from_uuid),
            quantity: row.try_get::<Decimal, _>("quantity")?,
            unit_cost: row.try_get::<Decimal, _>("unit_cost")?,
            sequence: row.try_get("sequence")?,
            is_deleted: row.try_get("is_deleted")?,
            ref_supplier_product: row.try_get("ref_supplier_product")?,
            description: row.try_get("description")?,
        })
    }

    /// Binds every column of a document, id first, in `DOCUMENT_COLUMNS` order.
    fn bind_document<'q>(
        query: Query<'q, Postgres, PgArguments>,
        doc: &Document,
        body: serde_json::Value,
    ) -> Query<'q, Postgres, PgArguments> {
        query
            .bind(doc.id.as_uuid())
            .bind(doc.kind().as_str())
            .bind(doc.kind().family().as_str())
            .bind(doc.reference.clone())
            .bind(doc.entity.as_ref().map(|e| e.as_str().to_string()))
            .bind(doc.sequential_id.map(|n| n as i64))
            .bind(doc.status.as_str())
            .bind(doc.parent_order.map(|id| id.as_uuid()))
            .bind(doc.delivery_date)
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .bind(doc.is_removed)
            .bind(body)
            .bind(doc.version as i64)
    }

    fn map_document_error(e: sqlx::Error, doc: &Document) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e {
            match db_err.constraint() {
                Some("unique_document_reference") => {
                    return StoreError::DuplicateReference {
                        family: doc.kind().family(),
                        reference: doc.reference.clone().unwrap_or_default(),
                    };
                }
                Some("documents_pkey") => return StoreError::AlreadyExists(doc.id.to_string()),
                _ => {}
            }
        }
        StoreError::Database(e)
    }

    fn where_clause(query: &DocumentQuery) -> String {
        let mut sql = String::from(" WHERE 1=1");
        let mut param_count = 0;

        if !query.include_removed {
            sql.push_str(" AND is_removed = FALSE");
        }
        if query.ids.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND id = ANY(${param_count})"));
        }
        if query.kinds.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND kind = ANY(${param_count})"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }
        if query.parent_order.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND parent_order = ${param_count}"));
        }
        if query.entity.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND entity = ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND strpos(lower(reference), lower(${param_count})) > 0"
            ));
        }
        sql
    }

    /// Binds filter parameters in the order `where_clause` numbers them.
    fn bind_filters<'q>(
        mut sqlx_query: Query<'q, Postgres, PgArguments>,
        query: &DocumentQuery,
    ) -> Query<'q, Postgres, PgArguments> {
        if let Some(ref ids) = query.ids {
            let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
            sqlx_query = sqlx_query.bind(ids);
        }
        if let Some(ref kinds) = query.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            sqlx_query = sqlx_query.bind(kinds);
        }
        if let Some(ref statuses) = query.statuses {
            let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(parent) = query.parent_order {
            sqlx_query = sqlx_query.bind(parent.as_uuid());
        }
        if let Some(ref entity) = query.entity {
            sqlx_query = sqlx_query.bind(entity.as_str().to_string());
        }
        if let Some(ref search) = query.search {
            sqlx_query = sqlx_query.bind(search.clone());
        }
        sqlx_query
    }

    /// Byte-wise reference ordering, missing values first when ascending.
    fn order_clause(sort: Sort) -> String {
        let column = match sort.key {
            SortKey::Reference => "reference COLLATE \"C\"",
            SortKey::CreatedAt => "created_at",
            SortKey::DeliveryDate => "delivery_date",
            SortKey::SequentialId => "sequential_id",
        };
        let direction = match sort.order {
            SortOrder::Asc => "ASC NULLS FIRST",
            SortOrder::Desc => "DESC NULLS LAST",
        };
        format!(" ORDER BY {column} {direction}, created_at ASC, id ASC")
    }

    async fn select_documents(
        conn: &mut PgConnection,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>> {
        let mut sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents");
        sql.push_str(&Self::where_clause(query));
        sql.push_str(&Self::order_clause(query.sort));
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let rows = Self::bind_filters(sqlx::query(&sql), query)
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn select_lines(conn: &mut PgConnection, order_id: DocumentId) -> Result<Vec<Line>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM order_lines \
             WHERE order_id = $1 AND is_deleted = FALSE ORDER BY position ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *conn)
            .await?;
        rows.into_iter().map(Self::row_to_line).collect()
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(&self, document: Document) -> Result<()> {
        let body = serde_json::to_value(&document)?;
        let sql = format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );

        Self::bind_document(sqlx::query(&sql), &document, body)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_document_error(e, &document))?;

        Ok(())
    }

    async fn update(&self, mut document: Document, expected_version: u64) -> Result<()> {
        document.version = expected_version + 1;
        let body = serde_json::to_value(&document)?;
        let result = Self::bind_document(
            sqlx::query(
                r#"
                UPDATE documents SET
                    kind = $2, family = $3, reference = $4, entity = $5, sequential_id = $6,
                    status = $7, parent_order = $8, delivery_date = $9, created_at = $10,
                    updated_at = $11, is_removed = $12, body = $13, version = $14
                WHERE id = $1 AND version = $15
                "#,
            ),
            &document,
            body,
        )
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_document_error(e, &document))?;

        if result.rows_affected() == 0 {
            // Either the row is gone or another write moved the version on
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM documents WHERE id = $1")
                    .bind(document.id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;

            return Err(match actual {
                Some(actual) => StoreError::ConcurrencyConflict {
                    document_id: document.id,
                    expected: expected_version,
                    actual: actual as u64,
                },
                None => StoreError::DocumentNotFound(document.id),
            });
        }
        Ok(())
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT body FROM documents
            WHERE reference = $1 AND is_removed = FALSE
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find_many(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        Self::select_documents(&mut conn, &query).await
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) AS total FROM documents");
        sql.push_str(&Self::where_clause(&query));

        let row = Self::bind_filters(sqlx::query(&sql), &query)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    async fn insert_line(&self, line: Line) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_id, product_id, quantity, unit_cost, sequence,
                                     is_deleted, ref_supplier_product, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.order_id.as_uuid())
        .bind(line.product_id.map(|id| id.as_uuid()))
        .bind(line.quantity)
        .bind(line.unit_cost)
        .bind(line.sequence)
        .bind(line.is_deleted)
        .bind(&line.ref_supplier_product)
        .bind(&line.description)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("order_lines_order_id_fkey") => {
                        return StoreError::DocumentNotFound(line.order_id);
                    }
                    Some("order_lines_pkey") => return StoreError::AlreadyExists(line.id.to_string()),
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_line(&self, line: Line) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE order_lines SET
                product_id = $2, quantity = $3, unit_cost = $4, sequence = $5,
                is_deleted = $6, ref_supplier_product = $7, description = $8
            WHERE id = $1
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.product_id.map(|id| id.as_uuid()))
        .bind(line.quantity)
        .bind(line.unit_cost)
        .bind(line.sequence)
        .bind(line.is_deleted)
        .bind(&line.ref_supplier_product)
        .bind(&line.description)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LineNotFound(line.id));
        }
        Ok(())
    }

    async fn find_line(&self, id: LineId) -> Result<Option<Line>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM order_lines WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_line).transpose()
    }

    async fn lines_for_order(&self, order_id: DocumentId) -> Result<Vec<Line>> {
        let mut conn = self.pool.acquire().await?;
        Self::select_lines(&mut conn, order_id).await
    }

    #[tracing::instrument(skip(self, linked))]
    async fn load_order_graph(
        &self,
        root: DocumentId,
        linked: DocumentQuery,
    ) -> Result<OrderGraph> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let lines = Self::select_lines(&mut tx, root).await?;
        let linked = Self::select_documents(&mut tx, &linked).await?;

        tx.commit().await?;
        Ok(OrderGraph { lines, linked })
    }
}

/// PostgreSQL-backed sequence store.
///
/// Each increment is a single upsert, so concurrent callers are serialized
/// by the row lock on the counter.
#[derive(Clone)]
pub struct PostgresSequenceStore {
    pool: PgPool,
}

impl PostgresSequenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceStore for PostgresSequenceStore {
    async fn next_value(&self, scope: &ScopeKey) -> Result<u64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sequences (scope, value) VALUES ($1, 1)
            ON CONFLICT (scope) DO UPDATE SET value = sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(scope.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(%scope, value, "Sequence incremented");
        Ok(value as u64)
    }

    async fn current_value(&self, scope: &ScopeKey) -> Result<u64> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sequences WHERE scope = $1")
            .bind(scope.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.map(|v| v as u64).unwrap_or(0))
    }
}
