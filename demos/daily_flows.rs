use hydat::{Hydat, HydatError};
use polars::prelude::{col, lit};
use std::env;

#[tokio::main]
async fn main() -> Result<(), HydatError> {
    configure_polars_display();
    let archive = env::args()
        .nth(1)
        .unwrap_or_else(|| "Hydat.sqlite3".to_string());
    let hydat = Hydat::with_archive(archive).await?;

    let flows = hydat
        .daily_flows()
        .station_number(&["08MF005", "05AA008"])
        .start_date("1990-01-01")
        .end_date("1990-12-31")
        .call()
        .await?;
    println!("{}", flows.report);

    let high_water = flows
        .filter(col("Value").gt(lit(5000.0)))
        .collect()?;
    println!("{:#?}", high_water);

    let annual = hydat
        .annual_stats()
        .prov_terr_state_loc(&["PE"])
        .call()
        .await?
        .collect()?;
    println!("{:#?}", annual);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
