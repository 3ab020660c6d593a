//! Inventory models: materials and stock movements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consumable material tracked in inventory.
///
/// `current_stock` is maintained exclusively by stock-movement triggers in
/// the store; new materials always start at zero and are loaded via an
/// inbound movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    pub id: String,
    pub name: String,
    /// Free-form unit label (units, boxes, kg, ...)
    pub unit: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub target_stock: f64,
    pub created_at: DateTime<Utc>,
}

impl Material {
    pub fn new(name: String, unit: String) -> Self {
        Self {
            id: super::new_id(),
            name,
            unit,
            current_stock: 0.0,
            min_stock: 0.0,
            target_stock: 0.0,
            created_at: super::now_utc(),
        }
    }

    /// Whether the material has fallen below its minimum stock level.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock < self.min_stock
    }
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MovementType {
    Inbound,
    Outbound,
    /// Corrections; must carry a reason
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::Outbound => "outbound",
            MovementType::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(MovementType::Inbound),
            "outbound" => Some(MovementType::Outbound),
            "adjustment" => Some(MovementType::Adjustment),
            _ => None,
        }
    }
}

/// One stock movement for a material. Quantity is always positive; the
/// type determines the sign applied to stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: String,
    pub material_id: String,
    pub movement_type: MovementType,
    pub quantity: f64,
    pub reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_material_starts_empty() {
        let material = Material::new("Composite resin".into(), "boxes".into());
        assert_eq!(material.current_stock, 0.0);
        assert!(!material.is_low_stock());
    }

    #[test]
    fn test_low_stock() {
        let mut material = Material::new("Gloves".into(), "boxes".into());
        material.min_stock = 5.0;
        material.current_stock = 3.0;
        assert!(material.is_low_stock());
    }

    #[test]
    fn test_movement_type_round_trip() {
        for t in [
            MovementType::Inbound,
            MovementType::Outbound,
            MovementType::Adjustment,
        ] {
            assert_eq!(MovementType::parse(t.as_str()), Some(t));
        }
    }
}
