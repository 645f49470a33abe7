use super::RepositoryScraper;
use crate::config::{Config, FailurePolicy};
use crate::error::ScrapeError;
use crate::git::{Git2Backend, RepositoryBackend};
use crate::types::{BatchOutput, Notification, NotificationRecord, RepositoryDescriptor};

/// Scrapes a list of repositories in order
pub struct BatchScraper<B: RepositoryBackend = Git2Backend> {
    scraper: RepositoryScraper<B>,
    on_failure: FailurePolicy,
}

impl BatchScraper<Git2Backend> {
    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        Ok(Self::new(
            RepositoryScraper::from_config(config)?,
            config.batch.on_failure,
        ))
    }
}

impl<B: RepositoryBackend> BatchScraper<B> {
    pub fn new(scraper: RepositoryScraper<B>, on_failure: FailurePolicy) -> Self {
        Self {
            scraper,
            on_failure,
        }
    }

    pub fn scraper(&self) -> &RepositoryScraper<B> {
        &self.scraper
    }

    pub fn on_failure(&self) -> FailurePolicy {
        self.on_failure
    }

    /// Scrape every repository and collect the per-repository maps
    ///
    /// Under [`FailurePolicy::Abort`] the first failure is returned as is.
    /// Under [`FailurePolicy::Notify`] it is recorded against the repository
    /// and the batch moves on; the failed repository gets no result entries.
    pub fn scrape(
        &self,
        descriptors: &[RepositoryDescriptor],
    ) -> Result<BatchOutput, ScrapeError> {
        let mut output = BatchOutput::default();

        for descriptor in descriptors {
            tracing::info!("Scraping repository {}", descriptor.name);

            let mut record = NotificationRecord::new(descriptor.notification_emails.clone());

            match self.scraper.scrape_one(descriptor) {
                Ok(result) => {
                    tracing::info!(
                        "Got {} commits for {}",
                        result.commit_count(),
                        descriptor.name
                    );
                    output.insert(&descriptor.name, result);
                }
                Err(e) => match self.on_failure {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Notify => {
                        tracing::warn!("Failed to scrape {}: {}", descriptor.name, e);
                        record.notifications.push(Notification {
                            subject: format!("Failed to scrape repository '{}'", descriptor.name),
                            message: e.report(),
                        });
                    }
                },
            }

            output
                .notifications
                .insert(descriptor.name.clone(), record);
        }

        Ok(output)
    }
}

impl<B: RepositoryBackend> std::fmt::Debug for BatchScraper<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScraper")
            .field("scraper", &self.scraper)
            .field("on_failure", &self.on_failure)
            .finish()
    }
}
