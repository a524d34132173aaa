use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::{
    calculators::{PlayRateCalculator, TeamplayRateCalculator, WinRateCalculator},
    RateCalculator, RatingBreakdown, RatingContext, RatingError, SaveMode,
};
use crate::calendar::{tickets_available_so_far, weeks_since_league_start, TICKETS_PER_LEAGUE};
use crate::shared::AppError;
use crate::store::{Participation, PlayerModel, Store};

pub struct RatingService {
    calculators: Vec<Arc<dyn RateCalculator>>,
    store: Arc<dyn Store>,
}

impl RatingService {
    pub fn builder(store: Arc<dyn Store>) -> RatingServiceBuilder {
        RatingServiceBuilder::new(store)
    }

    /// Tickets granted between `tracking_start` and `now`: the ones already
    /// out in the origin week, every complete league since, and the ones
    /// out so far in the current week.
    pub fn tickets_available(
        tracking_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u32, RatingError> {
        let complete_leagues = weeks_since_league_start(tracking_start, now)?;
        Ok(tickets_available_so_far(tracking_start)
            + TICKETS_PER_LEAGUE * complete_leagues
            + tickets_available_so_far(now))
    }

    /// Rates one player from their participations. `None` when the player
    /// cannot have a club league rating.
    pub fn compute(
        &self,
        player: &PlayerModel,
        participations: &[Participation],
        now: DateTime<Utc>,
    ) -> Result<Option<RatingBreakdown>, RatingError> {
        if !player.is_rating_eligible() {
            return Ok(None);
        }

        let in_window: Vec<Participation> = participations
            .iter()
            .filter(|p| p.date >= player.tracking_start && p.date < now)
            .cloned()
            .collect();

        let context = RatingContext {
            tracking_start: player.tracking_start,
            now,
            tickets_available: Self::tickets_available(player.tracking_start, now)?,
        };

        let mut breakdown = RatingBreakdown::default();
        for calculator in &self.calculators {
            let rate = calculator.calculate(&in_window, &context);
            breakdown.set(calculator.component(), rate);
            breakdown.rating += rate * calculator.weight();
        }

        Ok(Some(breakdown))
    }

    /// Rates every eligible player in place without saving. Returns how many
    /// were rated.
    #[instrument(skip(self, players), fields(count = players.len()))]
    pub async fn rate_players(
        &self,
        players: &mut [PlayerModel],
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let eligible: Vec<String> = players
            .iter()
            .filter(|p| p.is_rating_eligible())
            .map(|p| p.player_tag.clone())
            .collect();
        let Some(since) = players
            .iter()
            .filter(|p| p.is_rating_eligible())
            .map(|p| p.tracking_start)
            .min()
        else {
            return Ok(0);
        };

        let mut participations = self.store.participations_since(&eligible, since).await?;

        let mut rated = 0;
        for player in players.iter_mut() {
            let played = participations
                .remove(&player.player_tag)
                .unwrap_or_default();
            match self.compute(player, &played, now) {
                Ok(Some(breakdown)) => {
                    breakdown.apply_to(player);
                    rated += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    error!(
                        player_tag = %player.player_tag,
                        error = %err,
                        "Could not rate player, leaving rating unchanged"
                    );
                }
            }
        }

        debug!(rated, "Ratings computed");
        Ok(rated)
    }

    /// Recomputes one stored player's rating. Ineligible players are returned
    /// unchanged and never written.
    #[instrument(skip(self))]
    pub async fn update_rating(
        &self,
        player_tag: &str,
        now: DateTime<Utc>,
        mode: SaveMode,
    ) -> Result<PlayerModel, AppError> {
        let mut player = self
            .store
            .get_player(player_tag)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {player_tag}")))?;

        if !player.is_rating_eligible() {
            debug!(player_tag = %player_tag, "Player cannot be rated, leaving rating unchanged");
            return Ok(player);
        }

        let participations = self
            .store
            .participations_since(&[player.player_tag.clone()], player.tracking_start)
            .await?
            .remove(&player.player_tag)
            .unwrap_or_default();

        if let Some(breakdown) = self.compute(&player, &participations, now)? {
            breakdown.apply_to(&mut player);
            info!(
                player_tag = %player_tag,
                rating = breakdown.rating,
                "Rating updated"
            );
        }

        if mode == SaveMode::Immediate {
            self.store
                .bulk_update_players(std::slice::from_ref(&player))
                .await?;
        }

        Ok(player)
    }
}

pub struct RatingServiceBuilder {
    calculators: Vec<Arc<dyn RateCalculator>>,
    store: Arc<dyn Store>,
}

impl RatingServiceBuilder {
    fn new(store: Arc<dyn Store>) -> Self {
        Self {
            calculators: vec![
                Arc::new(PlayRateCalculator::new()),
                Arc::new(TeamplayRateCalculator::new()),
                Arc::new(WinRateCalculator::new()),
            ],
            store,
        }
    }

    /// Replaces the calculator of the same component.
    pub fn with_calculator(mut self, calculator: Arc<dyn RateCalculator>) -> Self {
        self.calculators
            .retain(|c| c.component() != calculator.component());
        self.calculators.push(calculator);
        self
    }

    pub fn build(self) -> Result<RatingService, RatingError> {
        let total: f64 = self.calculators.iter().map(|c| c.weight()).sum();
        if (total - 100.0).abs() > f64::EPSILON * 100.0 {
            return Err(RatingError::InvalidWeights(total));
        }

        Ok(RatingService {
            calculators: self.calculators,
            store: self.store,
        })
    }
}
