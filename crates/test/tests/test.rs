#[benchfleet_test::test(remote)]
fn remote_endpoint_required() -> Result<(), ()> {
  log::info!("Hello, world!");
  log::warn!("Hello, world!");
  log::error!("Hello, world!");

  Ok(())
}

#[benchfleet_test::test]
async fn test() -> Result<(), ()> {
  log::info!("Hello, world!");
  log::debug!("Hello, world!");
  log::trace!("Hello, world!");

  Ok(())
}
