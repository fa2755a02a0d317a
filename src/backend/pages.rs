use crate::api::{
    client::Client,
    error::Result,
    id::PageToken,
    run::Run,
    search::{RunPage, SearchRuns},
};

/// Lazily fetches the pages of a run search.
///
/// Each call to `next` sends one request. Iteration ends after a page
/// without a `next_page_token`, after a page repeating the token it was
/// requested with, or after the first error.
pub struct SearchPages<'a> {
    client: &'a dyn Client,
    query: SearchRuns,
    token: Option<PageToken>,
    done: bool,
}

impl<'a> SearchPages<'a> {
    pub fn new(client: &'a dyn Client, query: SearchRuns) -> Self {
        let token = query.page_token.clone();
        SearchPages {
            client,
            query,
            token,
            done: false,
        }
    }

    /// Start over from the query's own page token.
    pub fn restart(&mut self) {
        self.token = self.query.page_token.clone();
        self.done = false;
    }

    /// The token the next request will carry. Keep it to resume later with
    /// [`SearchRuns::page_token`].
    pub fn next_page_token(&self) -> Option<&PageToken> {
        if self.done {
            None
        } else {
            self.token.as_ref()
        }
    }

    /// Flatten the pages into single runs.
    pub fn runs(self) -> impl Iterator<Item = Result<Run>> + 'a {
        self.flat_map(|page| -> Box<dyn Iterator<Item = Result<Run>>> {
            match page {
                Ok(page) => Box::new(page.runs.into_iter().map(Ok)),
                Err(error) => Box::new(std::iter::once(Err(error))),
            }
        })
    }
}

impl Iterator for SearchPages<'_> {
    type Item = Result<RunPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut query = self.query.clone();
        query.page_token = self.token.clone();
        match self.client.search_runs(&query) {
            Ok(page) => {
                match page.next() {
                    // A server repeating the token it was sent would loop forever.
                    Some(token) if Some(token) != query.page_token.as_ref() => {
                        self.token = Some(token.clone())
                    }
                    _ => self.done = true,
                }
                Some(Ok(page))
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

impl std::iter::FusedIterator for SearchPages<'_> {}
