use hydat::{Hydat, HydatError, WebServiceCredentials};
use std::env;

#[tokio::main]
async fn main() -> Result<(), HydatError> {
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    let hydat = Hydat::new().await?;

    let stations = hydat
        .realtime_stations()
        .prov_terr_state_loc(&["PE"])
        .call()
        .await?
        .collect()?;
    println!("{:#?}", stations);

    let recent = hydat
        .realtime_dd()
        .station_number(&["08MF005", "01AP004"])
        .call()
        .await?;
    if !recent.is_complete() {
        println!("{}", recent.report);
    }
    println!("{:#?}", recent.collect()?);

    // the web service needs WS_USRNM and WS_PWD
    let Ok(credentials) = WebServiceCredentials::from_env() else {
        return Ok(());
    };
    let token = hydat.issue_token(&credentials).await?;
    let ws = hydat
        .realtime_ws()
        .station_number(&["08MF005"])
        .parameters(&[46, 47, 5])
        .token(&token)
        .call()
        .await?
        .collect()?;
    println!("{:#?}", ws);

    Ok(())
}
