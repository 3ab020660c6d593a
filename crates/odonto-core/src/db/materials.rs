//! Inventory database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_instant, instant_from_sql, Database, DbError, DbResult};
use crate::models::{Material, MovementType, StockMovement};

fn material_from_row(row: &Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
        current_stock: row.get(3)?,
        min_stock: row.get(4)?,
        target_stock: row.get(5)?,
        created_at: instant_from_sql(6, row.get(6)?)?,
    })
}

fn movement_from_row(row: &Row<'_>) -> rusqlite::Result<StockMovement> {
    let movement_type: String = row.get(2)?;
    Ok(StockMovement {
        id: row.get(0)?,
        material_id: row.get(1)?,
        movement_type: MovementType::parse(&movement_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown movement type: {}", movement_type).into(),
            )
        })?,
        quantity: row.get(3)?,
        reason: row.get(4)?,
        created_by: row.get(5)?,
        created_at: instant_from_sql(6, row.get(6)?)?,
    })
}

impl Database {
    /// Insert a new material. Stock always starts at zero; initial stock is
    /// loaded via an inbound movement.
    pub fn insert_material(&self, material: &Material) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO materials (id, name, unit, current_stock, min_stock, target_stock, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
            params![
                material.id,
                material.name,
                material.unit,
                material.min_stock,
                material.target_stock,
                format_instant(material.created_at),
            ],
        )?;
        Ok(())
    }

    /// Update a material's descriptive fields (never its stock).
    pub fn update_material(&self, material: &Material) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE materials SET name = ?2, unit = ?3, min_stock = ?4, target_stock = ?5
             WHERE id = ?1",
            params![
                material.id,
                material.name,
                material.unit,
                material.min_stock,
                material.target_stock,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a material by ID.
    pub fn get_material(&self, id: &str) -> DbResult<Option<Material>> {
        self.conn
            .query_row(
                "SELECT id, name, unit, current_stock, min_stock, target_stock, created_at
                 FROM materials WHERE id = ?",
                [id],
                material_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all materials.
    pub fn list_materials(&self) -> DbResult<Vec<Material>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, unit, current_stock, min_stock, target_stock, created_at
             FROM materials ORDER BY name",
        )?;

        let rows = stmt.query_map([], material_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Materials below their minimum stock level.
    pub fn list_low_stock_materials(&self) -> DbResult<Vec<Material>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, unit, current_stock, min_stock, target_stock, created_at
             FROM materials WHERE current_stock < min_stock ORDER BY name",
        )?;

        let rows = stmt.query_map([], material_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Record a stock movement. The schema triggers apply the quantity to
    /// the material's stock and abort outbound moves that would go negative.
    pub fn insert_stock_movement(&self, movement: &StockMovement) -> DbResult<()> {
        self.conn
            .execute(
                "INSERT INTO stock_movements (id, material_id, movement_type, quantity, reason, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    movement.id,
                    movement.material_id,
                    movement.movement_type.as_str(),
                    movement.quantity,
                    movement.reason,
                    movement.created_by,
                    format_instant(movement.created_at),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("Insufficient stock") => {
                    DbError::Constraint("Insufficient stock for outbound movement".into())
                }
                other => DbError::Sqlite(other),
            })?;
        Ok(())
    }

    /// Recent movements for a material, newest first.
    pub fn list_stock_movements(&self, material_id: &str, limit: usize) -> DbResult<Vec<StockMovement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, material_id, movement_type, quantity, reason, created_by, created_at
             FROM stock_movements WHERE material_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map(params![material_id, limit as i64], movement_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
