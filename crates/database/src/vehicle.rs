//! Vehicle CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Vehicle;

/// Fields for registering a vehicle.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub plate: String,
    pub brand: String,
    pub model: String,
}

/// Register a new vehicle. The plate is stored uppercase.
pub async fn create_vehicle(pool: &SqlitePool, vehicle: &NewVehicle) -> Result<Vehicle> {
    let plate = vehicle.plate.to_uppercase();

    let result = sqlx::query(
        r#"
        INSERT INTO vehicles (plate, brand, model)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&plate)
    .bind(&vehicle.brand)
    .bind(&vehicle.model)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Vehicle",
                    id: plate.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(Vehicle {
        id: result.last_insert_rowid(),
        plate,
        brand: vehicle.brand.clone(),
        model: vehicle.model.clone(),
    })
}

/// Get a vehicle by ID.
pub async fn get_vehicle(pool: &SqlitePool, id: i64) -> Result<Vehicle> {
    sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, plate, brand, model
        FROM vehicles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Vehicle",
        id: id.to_string(),
    })
}

/// Look up a vehicle by plate (case-insensitive).
pub async fn find_by_plate(pool: &SqlitePool, plate: &str) -> Result<Option<Vehicle>> {
    let vehicle = sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, plate, brand, model
        FROM vehicles
        WHERE plate = ?
        "#,
    )
    .bind(plate.to_uppercase())
    .fetch_optional(pool)
    .await?;

    Ok(vehicle)
}
