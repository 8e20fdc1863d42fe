use measurements::Power;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashRateUnit {
    MegaHash,
    GigaHash,
    TeraHash,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashRate {
    /// The current amount of hashes being computed
    pub value: f64,
    /// The unit of the hashes in value
    pub unit: HashRateUnit,
}

impl HashRate {
    pub fn from_gigahashes(value: f64) -> Self {
        Self {
            value,
            unit: HashRateUnit::GigaHash,
        }
    }

    pub fn as_gigahashes(&self) -> f64 {
        match self.unit {
            HashRateUnit::MegaHash => self.value / 1_000.0,
            HashRateUnit::GigaHash => self.value,
            HashRateUnit::TeraHash => self.value * 1_000.0,
        }
    }

    pub fn as_terahashes(&self) -> f64 {
        self.as_gigahashes() / 1_000.0
    }

    /// Efficiency in J/TH for a given power draw.
    ///
    /// `None` when the rate is not positive, so a stopped miner can never
    /// produce a division by zero.
    pub fn efficiency(&self, power: Power) -> Option<f64> {
        let terahashes = self.as_terahashes();
        (terahashes > 0.0).then(|| power.as_watts() / terahashes)
    }
}
