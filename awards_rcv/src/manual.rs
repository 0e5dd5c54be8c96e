/*!

This is the long-form manual for `awards_rcv` and `awardtally`.

## Ballots

A ballot export is a JSON array of ballot records:

```text
[
  {
    "id": "b-001",
    "voterName": "Sam",
    "timestamp": "2025-03-02T20:14:00Z",
    "flagged": false,
    "bestPictureRanks": ["m3", "m1", "m7", "m2", "m5"],
    "movies": [
      { "id": "m1", "title": "Anora", "seen": true, "rank": 2 },
      { "id": "m4", "title": "Wicked", "seen": false }
    ]
  }
]
```

Two generations of ballots coexist:

- recent ballots carry `bestPictureRanks`, the favorites in order of
  preference. It is used only when it lists exactly the rank count
  (5 by default) of distinct movies, all marked as seen.
- older ballots only carry a `rank` on each movie. The favorites are then
  read by increasing rank, ignoring ranks outside of `1..=rank count`,
  unseen movies, a rank given twice and a movie given twice.

A ballot that yields no favorite is still counted in the participation
figures but takes no part in the rounds. A ballot with `flagged` set to
`true` is left out of every figure except the total.

## Tabulation

The candidates are the movies that appear on at least one ballot. They are
ordered by title, then by id. This order is used to display them and to
break every tie.

In every round, each ballot counts for its highest ranked movie still
running. A movie wins with a majority of the ballots that still count for
somebody (`floor(active / 2) + 1`), or when it is the only one left. When
every movie left has the same number of votes, the first one wins the
tie-break. Movies without any vote are removed before the standings of the
round are shown. Otherwise all the movies sharing the lowest tally are
eliminated, one after the other, and their ballots move to the next
favorite still running or become exhausted.

## Presentation steps

The reveal is a list of steps, to be shown in order:

- `standings` the tallies at the start of a round without majority.
- `redistribution` one eliminated movie and the ballots it hands over.
- `threshold-update` the new majority after ballots were exhausted.
- `winner` the end of the reveal.

Every step carries the state of all the movies, with the ballots counted
for each of them, so that the display never has to recompute anything.

## Configuration

`awardtally` reads an optional JSON configuration:

```text
{
  "contestName": "Best Picture 2025",
  "contestDate": "2025-03-02",
  "ballotsPath": "ballots.json",
  "catalog": [ { "id": "m1", "title": "Anora" } ],
  "rules": { "rankCount": 5, "maxIterations": 500 }
}
```

Every field but `contestName` is optional. `ballotsPath` is relative to the
configuration file. The `--input` flag overrides it and `--rank-count`
overrides `rules.rankCount`. A catalog kept in its own file can be given with
`catalogPath`, an array of movies of which only `id` and `title` are read.
Inline `catalog` entries take precedence. The summary goes to standard output
unless `outputPath` or `--out` names a file.

 */
