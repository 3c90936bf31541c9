//! FCF resolver (combined fleet only)
//!
//! FCF can pull exactly one heavily damaged ship out of a combined fleet
//! mid-sortie. The offer is accepted only when the two fleets hold exactly one
//! heavily damaged ship between them.

use crate::error::SortieResult;
use crate::types::{CombatFleet, DamageCounts, Pattern, ScreenRegion, Severity, Template};
use crate::vision::VisionService;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcfDecision {
    Accept,
    Decline,
}

pub fn fcf_decision(main_heavy: u32, escort_heavy: u32) -> FcfDecision {
    if main_heavy + escort_heavy == 1 {
        FcfDecision::Accept
    } else {
        FcfDecision::Decline
    }
}

/// Answer the FCF offer if it is on screen. Returns `None` when there was no
/// offer.
///
/// On accept both fleets' FCF counters are incremented (they are restored into
/// each fleet's heavy tally when the sortie ends), and the combined tally
/// loses one heavy ship once the retreat click is confirmed.
pub async fn resolve_fcf(
    vision: &dyn VisionService,
    main: &mut CombatFleet,
    escort: &mut CombatFleet,
    combined: &mut DamageCounts,
) -> SortieResult<Option<FcfDecision>> {
    let retreat = Pattern::new(Template::FcfRetreatShip);
    if !vision.exists(ScreenRegion::LowerLeft, &retreat).await? {
        return Ok(None);
    }

    let decision = fcf_decision(main.damage.heavy(), escort.damage.heavy());
    match decision {
        FcfDecision::Accept => {
            main.increment_fcf_retreat_count();
            escort.increment_fcf_retreat_count();
            if vision.click(ScreenRegion::Lower, &retreat).await? {
                combined.remove_one(Severity::Heavy);
                info!(combined = %combined, "FCF retreat confirmed");
            } else {
                warn!("FCF retreat button vanished before it could be clicked");
            }
        }
        FcfDecision::Decline => {
            warn!(
                main_heavy = main.damage.heavy(),
                escort_heavy = escort.damage.heavy(),
                "Declining to retreat ship with FCF."
            );
            vision
                .click(ScreenRegion::Lower, &Pattern::new(Template::FcfContinueFleet))
                .await?;
        }
    }
    Ok(Some(decision))
}
