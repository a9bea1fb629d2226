//! Minting step: signs a custom token for the resolved uid.

// self
use crate::{
	_prelude::*,
	auth::{CustomToken, LocalUid},
	exchange::{Exchanger, observe},
	obs::ExchangeStep,
};

impl Exchanger {
	/// Mints a custom token bound to `uid`.
	pub async fn mint(&self, uid: &LocalUid) -> Result<CustomToken> {
		observe(ExchangeStep::Mint, "mint", async { Ok(self.minter.mint(uid).await?) }).await
	}
}
